//! The paper trader: order lifecycle, matching triggers and state fan-out.
//!
//! Every trigger on an instrument (placement, modification, cancellation,
//! snapshot refresh) runs under that instrument's async lock. Shared state
//! sits behind one synchronous mutex that is released before any await.

use crate::error::{PaperError, Result};
use crate::models::{Balances, PaperConfig};
use log::{debug, error, info, warn};
use paper_api::{
    BookUpdate, CommissionCalculator, DatumKind, ExchangeInfo, Execution, Instrument, MarketDataSource, Order,
    OrderId, Position, Side, SideFilter, StatePublisher, Symbol,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio::task::JoinHandle;

pub mod state;
pub mod subscription;

pub use state::{EngineState, Outbox, TraderState};
pub use subscription::{OrderBookSubscription, SubscriptionManager};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access to one instrument, released on drop.
struct InstrumentGuard<'a> {
    trader: &'a PaperTrader,
    symbol: Symbol,
    lock: Arc<tokio::sync::Mutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for InstrumentGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        self.trader.prune_lock(&self.symbol, &self.lock);
    }
}

pub struct PaperTrader {
    state: Mutex<EngineState>,
    books: SubscriptionManager,
    locks: Mutex<HashMap<Symbol, Arc<tokio::sync::Mutex<()>>>>,
    commission: Arc<dyn CommissionCalculator>,
    publisher: Arc<dyn StatePublisher>,
    feed: Mutex<Option<mpsc::UnboundedReceiver<BookUpdate>>>,
    exchanges: Vec<ExchangeInfo>,
    instrument_dictionary: String,
}

impl PaperTrader {
    pub fn new(
        config: &PaperConfig,
        source: Arc<dyn MarketDataSource>,
        commission: Arc<dyn CommissionCalculator>,
        publisher: Arc<dyn StatePublisher>,
    ) -> Arc<Self> {
        let (sink, feed) = mpsc::unbounded_channel();
        info!(
            "Paper trader starting with {} currencies and {} instruments",
            config.deposits().len(),
            config.instruments().len()
        );
        Arc::new(Self {
            state: Mutex::new(EngineState::new(config)),
            books: SubscriptionManager::new(source, sink, config.snapshot_timeout()),
            locks: Mutex::new(HashMap::new()),
            commission,
            publisher,
            feed: Mutex::new(Some(feed)),
            exchanges: config.exchanges().to_vec(),
            instrument_dictionary: config.instrument_dictionary().to_string(),
        })
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        guard(&self.state)
    }

    /// Waits for exclusive access to `symbol`. The lock entry is pruned from
    /// the map once the returned guard drops with nobody else queued on it.
    async fn lock_instrument(&self, symbol: &Symbol) -> InstrumentGuard<'_> {
        let lock = guard(&self.locks).entry(symbol.clone()).or_default().clone();
        let held = lock.clone().lock_owned().await;
        InstrumentGuard {
            trader: self,
            symbol: symbol.clone(),
            lock,
            held: Some(held),
        }
    }

    fn prune_lock(&self, symbol: &Symbol, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = guard(&self.locks);
        // The map and the caller hold the only references.
        if Arc::strong_count(lock) > 2 {
            return;
        }
        if locks.get(symbol).is_some_and(|current| Arc::ptr_eq(current, lock)) {
            locks.remove(symbol);
        }
    }

    fn flush(&self, outbox: Outbox) {
        for update in outbox {
            debug!("Publishing {:?}", update.kind());
            self.publisher.publish(update);
        }
    }

    /// Places a working limit order and runs the instrument's matching pass,
    /// so a marketable order may fill before this returns.
    pub async fn place_limit_order(
        &self,
        instrument: &Instrument,
        price: f64,
        quantity: f64,
        side: Side,
    ) -> Result<Order> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(PaperError::InvalidQuantity(quantity));
        }

        let symbol = instrument.symbol();
        let _serial = self.lock_instrument(symbol).await;

        let mut outbox = Outbox::new();
        let id = {
            let mut state = self.state();
            state
                .place(
                    instrument.clone(),
                    side,
                    quantity,
                    price,
                    paper_api::model::now_millis(),
                    &mut outbox,
                )
                .id()
        };
        self.flush(outbox);

        if let Err(e) = self.match_locked(symbol).await {
            // A working order always has a subscription.
            if matches!(e, PaperError::MarketData { .. }) && !self.books.is_subscribed(symbol) {
                warn!("Canceling order {}: no market data for {}", id, symbol);
                self.cancel_locked(id)?;
            }
            return Err(e);
        }
        self.order(id).ok_or(PaperError::UnknownOrder(id))
    }

    pub fn place_market_order(&self, instrument: &Instrument, quantity: f64, side: Side) -> Result<Order> {
        warn!(
            "Rejected market {} of {} {}: market orders are disabled",
            side,
            quantity,
            instrument.symbol()
        );
        Err(PaperError::MarketOrdersDisabled)
    }

    /// Moves the limit price of the matching working orders by
    /// `step_multiplier` ticks, then re-matches. Returns how many orders moved.
    pub async fn modify_orders(
        &self,
        symbol: &Symbol,
        filter: SideFilter,
        step_multiplier: f64,
    ) -> Result<usize> {
        let _serial = self.lock_instrument(symbol).await;

        let mut outbox = Outbox::new();
        let modified = self.state().modify(symbol, filter, step_multiplier, &mut outbox);
        self.flush(outbox);
        info!("Modified {} orders of {} by {} ticks", modified, symbol, step_multiplier);

        self.match_locked(symbol).await?;
        Ok(modified)
    }

    /// Cancels one order. Returns false when it was already filled or canceled.
    pub async fn cancel(&self, id: OrderId) -> Result<bool> {
        let symbol = self
            .order(id)
            .map(|order| order.symbol().clone())
            .ok_or(PaperError::UnknownOrder(id))?;
        let _serial = self.lock_instrument(&symbol).await;

        let canceled = self.cancel_locked(id)?;
        self.release_if_idle(&symbol).await?;
        Ok(canceled)
    }

    /// Cancels every working order of `symbol` passing `filter`. Returns how many were canceled.
    pub async fn cancel_all(&self, symbol: &Symbol, filter: SideFilter) -> Result<usize> {
        let _serial = self.lock_instrument(symbol).await;

        let ids = self.state().orders().working_ids(symbol, filter);
        let mut canceled = 0;
        for id in ids {
            if self.cancel_locked(id)? {
                canceled += 1;
            }
        }
        self.release_if_idle(symbol).await?;
        Ok(canceled)
    }

    fn cancel_locked(&self, id: OrderId) -> Result<bool> {
        let mut outbox = Outbox::new();
        let canceled = self.state().cancel(id, &mut outbox)?;
        self.flush(outbox);
        Ok(canceled)
    }

    /// Re-matches every working order of `symbol` against its latest snapshot.
    pub async fn evaluate_all(&self, symbol: &Symbol) -> Result<()> {
        let _serial = self.lock_instrument(symbol).await;
        self.match_locked(symbol).await
    }

    /// Stores a pushed snapshot and re-matches the instrument inline.
    /// Returns false when the instrument was not subscribed.
    pub async fn on_snapshot(&self, update: BookUpdate) -> Result<bool> {
        let symbol = update.symbol.clone();
        if !self.books.deliver(update) {
            debug!("Dropped snapshot for unsubscribed {}", symbol);
            return Ok(false);
        }
        self.evaluate_all(&symbol).await?;
        Ok(true)
    }

    /// Starts draining the market-data sink. Each delivery is stored at once
    /// and its matching pass is spawned, so the pump never waits on an
    /// instrument lock. Returns `None` if the pump already runs.
    pub fn spawn_feed(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut feed = guard(&self.feed).take()?;
        let trader = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            while let Some(update) = feed.recv().await {
                let Some(trader) = trader.upgrade() else {
                    break;
                };
                let symbol = update.symbol.clone();
                if !trader.books.deliver(update) {
                    debug!("Dropped snapshot for unsubscribed {}", symbol);
                    continue;
                }
                tokio::spawn(async move {
                    if let Err(e) = trader.evaluate_all(&symbol).await {
                        error!("Matching pass for {} failed: {} ({})", symbol, e, e.code());
                    }
                });
            }
            info!("Market data feed closed");
        }))
    }

    /// Runs the matching pass. The caller holds the instrument lock.
    async fn match_locked(&self, symbol: &Symbol) -> Result<()> {
        let has_working = self.state().orders().has_working(symbol);
        if !has_working {
            return self.release_if_idle(symbol).await;
        }

        let instrument = self
            .state()
            .instrument(symbol)
            .ok_or_else(|| PaperError::UnknownInstrument(symbol.clone()))?;
        let snapshot = self.books.await_snapshot(&instrument).await?;

        let mut outbox = Outbox::new();
        let result = {
            let mut state = self.state();
            state
                .orders()
                .working_ids(symbol, SideFilter::All)
                .into_iter()
                .try_for_each(|id| state.evaluate(id, &snapshot, self.commission.as_ref(), &mut outbox))
        };
        // Whatever settled before a failure is already booked and goes out.
        self.flush(outbox);

        let released = self.release_if_idle(symbol).await;
        result?;
        released
    }

    /// Drops the subscription of `symbol` once it has no working orders.
    async fn release_if_idle(&self, symbol: &Symbol) -> Result<()> {
        let idle = {
            let state = self.state();
            if state.orders().has_working(symbol) {
                None
            } else {
                state.instrument(symbol)
            }
        };
        match idle {
            Some(instrument) => self.books.unsubscribe(&instrument).await,
            None => Ok(()),
        }
    }

    /// Publishes every currency balance.
    pub fn publish_balances(&self) {
        let updates = self.state().balance_updates();
        self.flush(updates);
    }

    /// Recomputes and publishes every cached position.
    pub fn publish_positions(&self) {
        let updates = self.state().position_updates();
        self.flush(updates);
    }

    /// Publishes the current state of one kind, for a consumer that just attached.
    pub fn replay_kind(&self, kind: DatumKind) {
        match kind {
            DatumKind::Balance => self.publish_balances(),
            DatumKind::Position => self.publish_positions(),
            DatumKind::ActiveOrder => {
                let updates = self.state().working_order_updates();
                self.flush(updates);
            }
            DatumKind::TimelineItem => {
                let updates = self.state().timeline_updates();
                self.flush(updates);
            }
        }
    }

    /// Registers replay hooks for every kind on the publisher.
    pub fn attach_replay(self: &Arc<Self>) {
        for kind in DatumKind::ALL {
            let trader = Arc::downgrade(self);
            self.publisher.on_first_subscriber(
                kind,
                Box::new(move || {
                    if let Some(trader) = trader.upgrade() {
                        trader.replay_kind(kind);
                    }
                }),
            );
        }
    }

    pub fn export(&self) -> TraderState {
        self.state().export(&self.exchanges, &self.instrument_dictionary)
    }

    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.state().orders().get(id).cloned()
    }

    pub fn orders_for(&self, symbol: &Symbol) -> Vec<Order> {
        self.state().orders().for_symbol(symbol).cloned().collect()
    }

    pub fn instrument(&self, symbol: &Symbol) -> Option<Instrument> {
        self.state().instrument(symbol)
    }

    pub fn balance(&self, currency: &str) -> f64 {
        self.state().balances().get_balance(currency)
    }

    pub fn balances(&self) -> Balances {
        self.state().balances().clone()
    }

    /// Balances rebuilt from the initial deposits and the timeline.
    pub fn replayed_balances(&self) -> Balances {
        self.state().replayed_balances()
    }

    pub fn position(&self, symbol: &Symbol) -> Option<Position> {
        self.state().positions().get(symbol).cloned()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.state().positions().iter().cloned().collect()
    }

    pub fn timeline(&self) -> Vec<Execution> {
        self.state().timeline().iter().cloned().collect()
    }

    pub fn is_subscribed(&self, symbol: &Symbol) -> bool {
        self.books.is_subscribed(symbol)
    }

    pub fn subscribed_symbols(&self) -> Vec<Symbol> {
        self.books.subscribed_symbols()
    }
}
