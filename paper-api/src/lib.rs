//! # Paper API
//!
//! Shared models and integration seams for the paper trader.
//!
//! ## Modules
//! - `model`: Instruments, orders, book snapshots, executions and positions.
//! - `traits`: The market-data, commission and publishing boundaries the engine talks to.

pub mod model;
pub mod traits;

pub use model::execution::{Execution, OperationType};
pub use model::ids::{OrderId, Symbol};
pub use model::instrument::{ExchangeInfo, Instrument};
pub use model::market_data::{BookLevel, BookUpdate, OrderBookSnapshot};
pub use model::order::{Order, OrderKind, OrderStatus, Side, SideFilter};
pub use model::position::Position;
pub use model::update::{DatumKind, StateUpdate};
pub use traits::commission::{CommissionCalculator, CommissionError};
pub use traits::market_data::{MarketDataSource, SnapshotSink};
pub use traits::publisher::{ReplayHook, StatePublisher};

/// Quantities closer to zero than this are treated as zero.
pub const QTY_EPSILON: f64 = 1e-9;
