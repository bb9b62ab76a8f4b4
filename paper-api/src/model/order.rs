use super::ids::{OrderId, Symbol};
use crate::QTY_EPSILON;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Selects orders by side for bulk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideFilter {
    Buy,
    Sell,
    #[default]
    All,
}

impl SideFilter {
    pub fn matches(&self, side: Side) -> bool {
        match self {
            SideFilter::Buy => side == Side::Buy,
            SideFilter::Sell => side == Side::Sell,
            SideFilter::All => true,
        }
    }
}

impl From<Option<Side>> for SideFilter {
    fn from(side: Option<Side>) -> Self {
        match side {
            Some(Side::Buy) => SideFilter::Buy,
            Some(Side::Sell) => SideFilter::Sell,
            None => SideFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Limit,
}

/// Lifecycle of an order. `Filled` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Working,
    Filled,
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Working)
    }
}

/// A simulated order resting against the live book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    symbol: Symbol,
    side: Side,
    kind: OrderKind,
    status: OrderStatus,
    quantity: f64,
    filled: f64,
    price: f64,
    placed_at: i64,
}

impl Order {
    /// Creates a working limit order with nothing filled yet.
    pub fn limit(
        id: OrderId,
        symbol: Symbol,
        side: Side,
        quantity: f64,
        price: f64,
        placed_at: i64,
    ) -> Self {
        Self {
            id,
            symbol,
            side,
            kind: OrderKind::Limit,
            status: OrderStatus::Working,
            quantity,
            filled: 0.0,
            price,
            placed_at,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn filled(&self) -> f64 {
        self.filled
    }

    pub fn remaining(&self) -> f64 {
        (self.quantity - self.filled).max(0.0)
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn placed_at(&self) -> i64 {
        self.placed_at
    }

    pub fn is_working(&self) -> bool {
        self.status == OrderStatus::Working
    }

    /// Applies a fill of up to `quantity` and returns the amount actually applied.
    ///
    /// The fill is capped at the remaining quantity. Reaching the full quantity
    /// moves the order to `Filled`. Terminal orders absorb nothing.
    pub fn record_fill(&mut self, quantity: f64) -> f64 {
        if !self.is_working() || quantity <= 0.0 {
            return 0.0;
        }
        let remaining = self.remaining();
        if quantity >= remaining - QTY_EPSILON {
            self.filled = self.quantity;
            self.status = OrderStatus::Filled;
            remaining
        } else {
            self.filled += quantity;
            quantity
        }
    }

    /// Moves a working order to `Canceled`. Returns false if the order was already terminal.
    pub fn cancel(&mut self) -> bool {
        if !self.is_working() {
            return false;
        }
        self.status = OrderStatus::Canceled;
        true
    }

    /// Replaces the limit price of a working order. Returns false if the order is terminal.
    pub fn reprice(&mut self, price: f64) -> bool {
        if !self.is_working() {
            return false;
        }
        self.price = price;
        true
    }
}
