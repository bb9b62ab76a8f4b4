use super::ids::{OrderId, Symbol};
use super::instrument::Instrument;
use super::order::Side;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a timeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Buy,
    Sell,
}

impl OperationType {
    pub fn side(&self) -> Side {
        match self {
            OperationType::Buy => Side::Buy,
            OperationType::Sell => Side::Sell,
        }
    }
}

impl From<Side> for OperationType {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => OperationType::Buy,
            Side::Sell => OperationType::Sell,
        }
    }
}

/// A settled fill on the execution timeline. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    operation_id: Uuid,
    /// Originating order, absent for entries not driven by an order.
    parent_id: Option<OrderId>,
    symbol: Symbol,
    operation_type: OperationType,
    price: f64,
    quantity: f64,
    commission: f64,
    accrued_interest: f64,
    exchange: String,
    currency: String,
    created_at: i64,
}

impl Execution {
    pub fn new(
        parent_id: Option<OrderId>,
        instrument: &Instrument,
        side: Side,
        price: f64,
        quantity: f64,
        commission: f64,
        created_at: i64,
    ) -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            parent_id,
            symbol: instrument.symbol().clone(),
            operation_type: side.into(),
            price,
            quantity,
            commission,
            accrued_interest: 0.0,
            exchange: instrument.exchange().to_string(),
            currency: instrument.currency().to_string(),
            created_at,
        }
    }

    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    pub fn parent_id(&self) -> Option<OrderId> {
        self.parent_id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn side(&self) -> Side {
        self.operation_type.side()
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn accrued_interest(&self) -> f64 {
        self.accrued_interest
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Cash effect of this execution on its currency balance.
    ///
    /// Buys cost `price * quantity + commission`, sells credit `price * quantity - commission`.
    pub fn cash_delta(&self) -> f64 {
        let notional = self.price * self.quantity;
        match self.side() {
            Side::Buy => -(notional + self.commission),
            Side::Sell => notional - self.commission,
        }
    }
}
