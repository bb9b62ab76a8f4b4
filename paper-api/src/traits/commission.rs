//! Defines the `CommissionCalculator` seam.
//!
//! The calculator is built once at startup and handed to the trader. How it
//! is produced (a fee schedule from configuration, a compiled user formula)
//! is up to the host.

use crate::model::ids::Symbol;
use crate::model::instrument::Instrument;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommissionError {
    /// The calculator produced NaN or infinity.
    #[error("commission for {symbol} is not a finite number: {value}")]
    NonFinite { symbol: Symbol, value: f64 },

    /// The calculator itself failed.
    #[error("commission for {symbol} could not be computed: {reason}")]
    Failed { symbol: Symbol, reason: String },
}

/// Computes the commission charged for one fill.
pub trait CommissionCalculator: Send + Sync {
    /// # Arguments
    ///
    /// * `instrument` - The traded instrument.
    /// * `price` - The fill price.
    /// * `quantity` - The filled quantity (always positive).
    fn commission(
        &self,
        instrument: &Instrument,
        price: f64,
        quantity: f64,
    ) -> Result<f64, CommissionError>;
}

impl<F> CommissionCalculator for F
where
    F: Fn(&Instrument, f64, f64) -> Result<f64, CommissionError> + Send + Sync,
{
    fn commission(
        &self,
        instrument: &Instrument,
        price: f64,
        quantity: f64,
    ) -> Result<f64, CommissionError> {
        self(instrument, price, quantity)
    }
}
