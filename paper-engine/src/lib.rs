//! # Paper Engine
//!
//! Simulated order execution against live order-book snapshots.
//!
//! ## Modules
//! - `engine`: The [`engine::PaperTrader`], its state and its order-book subscriptions.
//! - `exchange`: Book sweep matching and fee schedules.
//! - `gateway`: Market-data sources (scripted and synthetic).
//! - `io`: Command interface, CLI arguments and state publishers.
//! - `models`: Ledger, order store, positions, instruments and configuration.

pub mod engine;
pub mod error;
pub mod exchange;
pub mod gateway;
pub mod io;
pub mod models;

pub use engine::PaperTrader;
pub use error::{PaperError, Result};
