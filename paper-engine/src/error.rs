use paper_api::{CommissionError, OrderId, Symbol};
use std::time::Duration;
use thiserror::Error;

/// Global error type for the paper trader.
///
/// Every variant carries a stable code (see [`PaperError::code`]) that an
/// external formatter can translate into a user-facing message.
#[derive(Error, Debug)]
pub enum PaperError {
    /// Market orders are categorically disabled in the simulator.
    #[error("market orders are disabled in paper trading")]
    MarketOrdersDisabled,

    /// Order quantity was zero, negative or not a number.
    #[error("order quantity must be a positive number, got {0}")]
    InvalidQuantity(f64),

    #[error("unknown instrument {0}")]
    UnknownInstrument(Symbol),

    #[error("unknown order {0}")]
    UnknownOrder(OrderId),

    /// The injected commission calculator failed while settling a fill.
    #[error("commission computation failed: {0}")]
    Commission(#[from] CommissionError),

    /// The market-data source refused to start or stop streaming.
    #[error("market data source failed for {symbol}: {source}")]
    MarketData {
        symbol: Symbol,
        #[source]
        source: anyhow::Error,
    },

    #[error("no order book snapshot for {0} within {1:?}")]
    SnapshotTimeout(Symbol, Duration),

    /// The subscription was released while a caller waited for its first snapshot.
    #[error("order book subscription for {0} closed before a snapshot arrived")]
    SubscriptionClosed(Symbol),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl PaperError {
    pub fn code(&self) -> &'static str {
        match self {
            PaperError::MarketOrdersDisabled => "MARKET_ORDERS_DISABLED",
            PaperError::InvalidQuantity(_) => "INVALID_QUANTITY",
            PaperError::UnknownInstrument(_) => "UNKNOWN_INSTRUMENT",
            PaperError::UnknownOrder(_) => "UNKNOWN_ORDER",
            PaperError::Commission(_) => "COMMISSION_FAILED",
            PaperError::MarketData { .. } => "MARKET_DATA",
            PaperError::SnapshotTimeout(..) => "SNAPSHOT_TIMEOUT",
            PaperError::SubscriptionClosed(_) => "SUBSCRIPTION_CLOSED",
            PaperError::Config(_) => "CONFIG",
        }
    }
}

/// A specialized Result type for paper trader operations.
pub type Result<T> = std::result::Result<T, PaperError>;
