use paper_api::{Execution, Instrument, Position, Side, Symbol, QTY_EPSILON};
use std::collections::BTreeMap;

fn is_zero(value: f64) -> bool {
    value.abs() < QTY_EPSILON
}

/// Running state of the weighted-average cost replay.
///
/// `size` is the net position. `total` and `current_sum` are the signed
/// quantity and notional of the current cost basis, reset whenever the
/// position goes flat.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBasis {
    pub size: f64,
    pub total: f64,
    pub current_sum: f64,
}

impl CostBasis {
    /// Folds one trade into the basis.
    pub fn apply(&mut self, side: Side, price: f64, quantity: f64) {
        let notional = price * quantity;
        let signed = side.sign() * quantity;

        if is_zero(self.total) {
            self.current_sum = notional;
            self.total = signed;
        } else if (side == Side::Buy && self.total > 0.0) || (side == Side::Sell && self.total < 0.0)
        {
            self.current_sum += notional;
            self.total += signed;
        } else if (side == Side::Buy && self.total + quantity >= -QTY_EPSILON)
            || (side == Side::Sell && self.total - quantity <= QTY_EPSILON)
        {
            // Reversal: whatever remains is priced at this trade.
            self.total += signed;
            self.current_sum = price * self.total;
        }
        // A partial reduction leaves the basis alone; only the size moves.

        self.size += signed;
        if is_zero(self.size) {
            self.size = 0.0;
            self.total = 0.0;
            self.current_sum = 0.0;
        }
    }

    /// `|current_sum / total|`, undefined while there is no basis.
    pub fn average_price(&self) -> Option<f64> {
        if is_zero(self.total) {
            None
        } else {
            Some((self.current_sum / self.total).abs())
        }
    }
}

/// Replays `executions` (one instrument, oldest first) into a cost basis.
pub fn replay<'a>(executions: impl IntoIterator<Item = &'a Execution>) -> CostBasis {
    let mut basis = CostBasis::default();
    for execution in executions {
        basis.apply(execution.side(), execution.price(), execution.quantity());
    }
    basis
}

/// Cached instrument positions. Flat positions are never stored.
#[derive(Debug, Clone, Default)]
pub struct Positions {
    holdings: BTreeMap<Symbol, Position>,
}

impl Positions {
    /// Stores a non-flat position, or drops the cached entry of a flat one.
    pub fn update(&mut self, position: Position) {
        if position.is_flat() {
            self.holdings.remove(position.symbol());
        } else {
            self.holdings.insert(position.symbol().clone(), position);
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Position> {
        self.holdings.get(symbol)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.holdings.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.holdings.values()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

/// Derives the position of `instrument` from its executions.
pub fn recompute<'a>(
    instrument: &Instrument,
    executions: impl IntoIterator<Item = &'a Execution>,
) -> Position {
    let basis = replay(executions);
    Position::instrument(instrument, basis.size, basis.average_price())
}
