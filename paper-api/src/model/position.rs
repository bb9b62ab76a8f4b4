use super::ids::Symbol;
use super::instrument::Instrument;
use crate::QTY_EPSILON;
use serde::{Deserialize, Serialize};

/// A holding as published to consumers.
///
/// Instrument positions carry a signed size and an average cost. Cash
/// balances reuse the same shape with `is_currency` set, a lot size of one
/// and no average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    symbol: Symbol,
    currency: String,
    /// Positive long, negative short, zero flat.
    size: f64,
    /// Weighted-average cost. `None` when flat.
    average_price: Option<f64>,
    lot_size: f64,
    is_currency: bool,
}

impl Position {
    pub fn instrument(instrument: &Instrument, size: f64, average_price: Option<f64>) -> Self {
        Self {
            symbol: instrument.symbol().clone(),
            currency: instrument.currency().to_string(),
            size,
            average_price,
            lot_size: instrument.lot_size(),
            is_currency: instrument.is_currency(),
        }
    }

    /// A cash balance shaped as a position record.
    pub fn balance(currency: &str, amount: f64) -> Self {
        Self {
            symbol: Symbol::new(currency),
            currency: currency.to_string(),
            size: amount,
            average_price: None,
            lot_size: 1.0,
            is_currency: true,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn average_price(&self) -> Option<f64> {
        self.average_price
    }

    pub fn lot_size(&self) -> f64 {
        self.lot_size
    }

    pub fn is_currency(&self) -> bool {
        self.is_currency
    }

    pub fn is_flat(&self) -> bool {
        self.size.abs() < QTY_EPSILON
    }
}
