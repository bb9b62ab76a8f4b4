use paper_api::model::instrument::normalize_to_tick;
use paper_api::{Instrument, Symbol};
use std::collections::HashMap;

/// Instruments the trader has seen, keyed by symbol.
///
/// Orders and positions refer to instruments by symbol; this table holds the
/// single copy, including tick sizes recorded on first use.
#[derive(Debug, Clone, Default)]
pub struct InstrumentTable {
    instruments: HashMap<Symbol, Instrument>,
}

impl InstrumentTable {
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let mut table = Self::default();
        for instrument in instruments {
            table.register(instrument);
        }
        table
    }

    /// Adds `instrument` unless its symbol is already known. The stored copy wins.
    pub fn register(&mut self, instrument: Instrument) -> &Instrument {
        self.instruments
            .entry(instrument.symbol().clone())
            .or_insert(instrument)
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Instrument> {
        self.instruments.get(symbol)
    }

    /// Tick size of `symbol`, recording the default for `price` when none is set.
    pub fn tick_size(&mut self, symbol: &Symbol, price: f64) -> Option<f64> {
        self.instruments
            .get_mut(symbol)
            .map(|instrument| instrument.tick_size_or_default(price))
    }

    /// Rounds `price` to the tick grid of `symbol`. Unknown symbols pass through unchanged.
    pub fn normalize_price(&mut self, symbol: &Symbol, price: f64) -> f64 {
        match self.tick_size(symbol, price) {
            Some(tick) => normalize_to_tick(price, tick),
            None => price,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }
}
