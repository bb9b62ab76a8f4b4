//! Market Data models.
//!
//! Order-book snapshots are wholesale replacements: every update carries the
//! full bid and ask ladders, best price first.

use super::ids::Symbol;
use super::order::Side;
use serde::{Deserialize, Serialize};

/// A single price level of the book.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BookLevel {
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub volume: f64,
}

impl BookLevel {
    pub fn new(price: f64, volume: f64) -> Self {
        Self { price, volume }
    }

    /// A level with a zero, negative or non-finite price or volume carries no liquidity.
    pub fn is_usable(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.volume.is_finite() && self.volume > 0.0
    }
}

/// Full view of an instrument's order book at one point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels, highest price first.
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    /// Ask levels, lowest price first.
    #[serde(default)]
    pub asks: Vec<BookLevel>,
    /// Unix millis at which the source produced the snapshot.
    #[serde(default)]
    pub timestamp: i64,
}

impl OrderBookSnapshot {
    pub fn new(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self {
            bids,
            asks,
            timestamp: super::now_millis(),
        }
    }

    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.iter().find(|level| level.is_usable())
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.iter().find(|level| level.is_usable())
    }

    /// The side of the book an order of `side` trades against: asks for buys, bids for sells.
    pub fn levels_against(&self, side: Side) -> &[BookLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }
}

/// A snapshot addressed to the instrument it belongs to, as pushed by a market-data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookUpdate {
    pub symbol: Symbol,
    pub snapshot: OrderBookSnapshot,
}

impl BookUpdate {
    pub fn new(symbol: Symbol, snapshot: OrderBookSnapshot) -> Self {
        Self { symbol, snapshot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_against_side() {
        let book = OrderBookSnapshot::new(
            vec![BookLevel::new(9.99, 5.0)],
            vec![BookLevel::new(10.01, 7.0)],
        );
        assert_eq!(book.levels_against(Side::Buy)[0].price, 10.01);
        assert_eq!(book.levels_against(Side::Sell)[0].price, 9.99);
    }

    #[test]
    fn test_best_levels_skip_empty_entries() {
        let book = OrderBookSnapshot::new(
            vec![BookLevel::new(0.0, 5.0), BookLevel::new(9.98, 2.0)],
            vec![BookLevel::new(10.02, 0.0), BookLevel::new(10.03, 1.0)],
        );
        assert_eq!(book.best_bid().map(|l| l.price), Some(9.98));
        assert_eq!(book.best_ask().map(|l| l.price), Some(10.03));
    }

    #[test]
    fn test_missing_level_fields_deserialize_as_unusable() {
        let level: BookLevel = serde_json::from_str(r#"{"price": 10.0}"#).unwrap();
        assert_eq!(level.volume, 0.0);
        assert!(!level.is_usable());
        assert!(!BookLevel::new(f64::NAN, 1.0).is_usable());
    }
}
