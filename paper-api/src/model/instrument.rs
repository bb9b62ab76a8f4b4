//! Defines the data models for tradable instruments and their venues.

use super::ids::Symbol;
use serde::{Deserialize, Serialize};

fn default_lot_size() -> f64 {
    1.0
}

/// A tradable instrument as the paper trader sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Identity key (e.g. "AAPL").
    symbol: Symbol,

    /// Venue the instrument trades on (e.g. "NASDAQ").
    exchange: String,

    /// Settlement currency (e.g. "USD").
    currency: String,

    /// Number of units per lot.
    #[serde(default = "default_lot_size")]
    lot_size: f64,

    /// Minimum price increment. Filled with a price-dependent default on first use when absent.
    #[serde(default)]
    tick_size: Option<f64>,

    /// Set for cash-like instruments (currencies).
    #[serde(default)]
    is_currency: bool,
}

impl Instrument {
    pub fn new(
        symbol: impl Into<Symbol>,
        exchange: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
            currency: currency.into(),
            lot_size: default_lot_size(),
            tick_size: None,
            is_currency: false,
        }
    }

    pub fn with_lot_size(mut self, lot_size: f64) -> Self {
        self.lot_size = lot_size;
        self
    }

    pub fn with_tick_size(mut self, tick_size: f64) -> Self {
        self.tick_size = Some(tick_size);
        self
    }

    pub fn as_currency(mut self) -> Self {
        self.is_currency = true;
        self
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn lot_size(&self) -> f64 {
        self.lot_size
    }

    pub fn tick_size(&self) -> Option<f64> {
        self.tick_size
    }

    pub fn is_currency(&self) -> bool {
        self.is_currency
    }

    /// Returns the recorded tick size, recording the default for `price` if none was set.
    pub fn tick_size_or_default(&mut self, price: f64) -> f64 {
        *self
            .tick_size
            .get_or_insert_with(|| default_tick_size(price))
    }
}

/// Tick size used when an instrument carries none: 0.0001 below 1.0, 0.01 otherwise.
pub fn default_tick_size(price: f64) -> f64 {
    if price < 1.0 {
        0.0001
    } else {
        0.01
    }
}

/// Rounds `price` to the nearest multiple of `tick`.
///
/// The result is also rounded to the tick's decimal precision so that
/// `10.07` with a `0.01` tick stays `10.07` instead of `10.070000000000002`.
pub fn normalize_to_tick(price: f64, tick: f64) -> f64 {
    if !(tick.is_finite() && tick > 0.0) {
        return price;
    }
    let snapped = (price / tick).round() * tick;
    let scale = 10f64.powi(tick_decimals(tick));
    (snapped * scale).round() / scale
}

fn tick_decimals(tick: f64) -> i32 {
    for decimals in 0..=10 {
        let scaled = tick * 10f64.powi(decimals);
        if (scaled - scaled.round()).abs() < 1e-9 {
            return decimals;
        }
    }
    10
}

/// Static venue and broker metadata exposed through the state surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub broker: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_size_default_is_recorded_on_first_use() {
        let mut penny = Instrument::new("PNY", "OTC", "USD");
        assert_eq!(penny.tick_size(), None);
        assert_eq!(penny.tick_size_or_default(0.5), 0.0001);
        // Later calls keep the recorded value even at a different price level.
        assert_eq!(penny.tick_size_or_default(50.0), 0.0001);

        let mut stock = Instrument::new("AAPL", "NASDAQ", "USD");
        assert_eq!(stock.tick_size_or_default(150.0), 0.01);
        assert_eq!(stock.tick_size(), Some(0.01));
    }

    #[test]
    fn test_normalize_to_tick() {
        assert_eq!(normalize_to_tick(10.004, 0.01), 10.0);
        assert_eq!(normalize_to_tick(10.006, 0.01), 10.01);
        assert_eq!(normalize_to_tick(10.07, 0.01), 10.07);
        assert_eq!(normalize_to_tick(10.3, 0.25), 10.25);
        assert_eq!(normalize_to_tick(0.123456, 0.0001), 0.1235);
        assert_eq!(normalize_to_tick(42.0, 0.0), 42.0);
    }

    #[test]
    fn test_instrument_deserialization_defaults() {
        let json = r#"{"symbol":"MSFT","exchange":"NASDAQ","currency":"USD"}"#;
        let instrument: Instrument = serde_json::from_str(json).unwrap();
        assert_eq!(instrument.symbol().as_str(), "MSFT");
        assert_eq!(instrument.lot_size(), 1.0);
        assert_eq!(instrument.tick_size(), None);
        assert!(!instrument.is_currency());
    }
}
