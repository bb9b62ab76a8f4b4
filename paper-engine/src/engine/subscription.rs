//! Lazily acquired order-book subscriptions, one record per instrument.

use crate::error::{PaperError, Result};
use log::{debug, info};
use paper_api::{BookUpdate, Instrument, MarketDataSource, OrderBookSnapshot, SnapshotSink, Symbol};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// Outcome of asking a record for its snapshot.
pub enum SnapshotWait {
    Ready(OrderBookSnapshot),
    Pending(oneshot::Receiver<OrderBookSnapshot>),
}

/// Live order-book state of one instrument.
pub struct OrderBookSubscription {
    instrument: Instrument,
    subscribed: bool,
    snapshot: Option<OrderBookSnapshot>,
    waiters: Vec<oneshot::Sender<OrderBookSnapshot>>,
}

impl OrderBookSubscription {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            subscribed: false,
            snapshot: None,
            waiters: Vec::new(),
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn snapshot(&self) -> Option<&OrderBookSnapshot> {
        self.snapshot.as_ref()
    }

    /// Returns true if the record was not subscribed before.
    pub fn mark_subscribed(&mut self) -> bool {
        !std::mem::replace(&mut self.subscribed, true)
    }

    /// Drops the cached snapshot and any pending waiters. Returns true if the record was subscribed.
    pub fn mark_unsubscribed(&mut self) -> bool {
        self.snapshot = None;
        self.waiters.clear();
        std::mem::replace(&mut self.subscribed, false)
    }

    /// The cached snapshot, or a one-shot receiver resolved by the next delivery.
    pub fn wait(&mut self) -> SnapshotWait {
        match &self.snapshot {
            Some(snapshot) => SnapshotWait::Ready(snapshot.clone()),
            None => {
                let (tx, rx) = oneshot::channel();
                self.waiters.push(tx);
                SnapshotWait::Pending(rx)
            }
        }
    }

    /// Stores `snapshot` and resolves every pending waiter once.
    /// Deliveries to an unsubscribed record are dropped.
    pub fn deliver(&mut self, snapshot: OrderBookSnapshot) -> bool {
        if !self.subscribed {
            return false;
        }
        for waiter in self.waiters.drain(..) {
            // A waiter whose caller went away is simply skipped.
            let _ = waiter.send(snapshot.clone());
        }
        self.snapshot = Some(snapshot);
        true
    }
}

/// Owns the subscription records and talks to the market-data source.
///
/// Records are only touched under a short synchronous lock; calls into the
/// source happen after the lock is released.
pub struct SubscriptionManager {
    source: Arc<dyn MarketDataSource>,
    sink: SnapshotSink,
    records: Mutex<HashMap<Symbol, OrderBookSubscription>>,
    snapshot_timeout: Option<Duration>,
}

impl SubscriptionManager {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        sink: SnapshotSink,
        snapshot_timeout: Option<Duration>,
    ) -> Self {
        Self {
            source,
            sink,
            records: Mutex::new(HashMap::new()),
            snapshot_timeout,
        }
    }

    fn records(&self) -> MutexGuard<'_, HashMap<Symbol, OrderBookSubscription>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts streaming `instrument` unless it is already subscribed.
    pub async fn subscribe(&self, instrument: &Instrument) -> Result<()> {
        let symbol = instrument.symbol();
        let newly = self
            .records()
            .entry(symbol.clone())
            .or_insert_with(|| OrderBookSubscription::new(instrument.clone()))
            .mark_subscribed();
        if !newly {
            return Ok(());
        }

        info!("Subscribing to order book of {}", symbol);
        if let Err(source) = self.source.subscribe(instrument, self.sink.clone()).await {
            self.records().remove(symbol);
            return Err(PaperError::MarketData {
                symbol: symbol.clone(),
                source,
            });
        }
        Ok(())
    }

    /// Stops streaming `instrument` and forgets its snapshot. No-op when not subscribed.
    pub async fn unsubscribe(&self, instrument: &Instrument) -> Result<()> {
        let symbol = instrument.symbol();
        let was_subscribed = self
            .records()
            .remove(symbol)
            .map(|mut record| record.mark_unsubscribed())
            .unwrap_or(false);
        if !was_subscribed {
            return Ok(());
        }

        info!("Releasing order book of {}", symbol);
        self.source
            .unsubscribe(instrument)
            .await
            .map_err(|source| PaperError::MarketData {
                symbol: symbol.clone(),
                source,
            })
    }

    /// The latest snapshot of `instrument`, subscribing first if needed.
    ///
    /// Suspends until the next delivery when nothing is cached. The wait is
    /// unbounded unless a snapshot timeout was configured.
    pub async fn await_snapshot(&self, instrument: &Instrument) -> Result<OrderBookSnapshot> {
        self.subscribe(instrument).await?;

        let symbol = instrument.symbol();
        let wait = match self.records().get_mut(symbol) {
            Some(record) => record.wait(),
            None => return Err(PaperError::SubscriptionClosed(symbol.clone())),
        };

        let rx = match wait {
            SnapshotWait::Ready(snapshot) => return Ok(snapshot),
            SnapshotWait::Pending(rx) => rx,
        };

        debug!("Waiting for first snapshot of {}", symbol);
        let received = match self.snapshot_timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| PaperError::SnapshotTimeout(symbol.clone(), limit))?,
            None => rx.await,
        };
        received.map_err(|_| PaperError::SubscriptionClosed(symbol.clone()))
    }

    /// Stores a pushed snapshot. Returns false if the instrument is not subscribed.
    pub fn deliver(&self, update: BookUpdate) -> bool {
        match self.records().get_mut(&update.symbol) {
            Some(record) => record.deliver(update.snapshot),
            None => false,
        }
    }

    pub fn is_subscribed(&self, symbol: &Symbol) -> bool {
        self.records()
            .get(symbol)
            .map(|record| record.is_subscribed())
            .unwrap_or(false)
    }

    pub fn subscribed_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .records()
            .iter()
            .filter(|(_, record)| record.is_subscribed())
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }
}
