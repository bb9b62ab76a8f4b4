//! Market-data sources the trader can be wired to.
//!
//! These decouple the trader from where order books come from (recorded
//! scripts, a random walk, a live venue adapter).

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use paper_api::{BookUpdate, Instrument, MarketDataSource, OrderBookSnapshot, SnapshotSink, Symbol};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod synthetic;

pub use synthetic::SyntheticFeed;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A source that serves preset books.
///
/// On subscribe it pushes the latest book it holds for the instrument (if
/// any). Further books are pushed with [`ScriptedFeed::push`].
#[derive(Default)]
pub struct ScriptedFeed {
    books: Mutex<HashMap<Symbol, OrderBookSnapshot>>,
    sinks: Mutex<HashMap<Symbol, SnapshotSink>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_book(self, symbol: impl Into<Symbol>, snapshot: OrderBookSnapshot) -> Self {
        guard(&self.books).insert(symbol.into(), snapshot);
        self
    }

    /// Replaces the book of `symbol` and streams it if the symbol is subscribed.
    /// Returns true if the book was sent.
    pub fn push(&self, symbol: impl Into<Symbol>, snapshot: OrderBookSnapshot) -> bool {
        let symbol = symbol.into();
        guard(&self.books).insert(symbol.clone(), snapshot.clone());
        match guard(&self.sinks).get(&symbol) {
            Some(sink) => sink.send(BookUpdate::new(symbol, snapshot)).is_ok(),
            None => false,
        }
    }

    pub fn is_streaming(&self, symbol: &Symbol) -> bool {
        guard(&self.sinks).contains_key(symbol)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedFeed {
    async fn subscribe(&self, instrument: &Instrument, sink: SnapshotSink) -> Result<()> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let symbol = instrument.symbol().clone();
        debug!("[ScriptedFeed] Streaming {}", symbol);

        if let Some(snapshot) = guard(&self.books).get(&symbol).cloned() {
            sink.send(BookUpdate::new(symbol.clone(), snapshot))?;
        }
        guard(&self.sinks).insert(symbol, sink);
        Ok(())
    }

    async fn unsubscribe(&self, instrument: &Instrument) -> Result<()> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        debug!("[ScriptedFeed] Stopped {}", instrument.symbol());
        guard(&self.sinks).remove(instrument.symbol());
        Ok(())
    }
}
