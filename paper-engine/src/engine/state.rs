//! Process-wide trader state and the synchronous half of every operation.
//!
//! Nothing here awaits. Callers hold the state lock for one method call and
//! publish the collected updates after releasing it.

use crate::error::{PaperError, Result};
use crate::exchange::sweep;
use crate::models::{portfolio, Balances, InstrumentTable, OrderStore, PaperConfig, Positions, Timeline};
use log::{debug, info};
use paper_api::model::instrument::{default_tick_size, normalize_to_tick};
use paper_api::{
    CommissionCalculator, CommissionError, ExchangeInfo, Execution, Instrument, Order, OrderBookSnapshot,
    OrderId, OrderStatus, Position, Side, SideFilter, StateUpdate, Symbol, QTY_EPSILON,
};
use serde::{Deserialize, Serialize};

/// Updates produced under the state lock, published once it is released.
pub type Outbox = Vec<StateUpdate>;

/// Serializable snapshot of everything the trader holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderState {
    pub balances: Balances,
    pub history: Vec<Execution>,
    pub orders: Vec<Order>,
    pub positions: Vec<Position>,
    pub exchanges: Vec<ExchangeInfo>,
    pub instrument_dictionary: String,
}

#[derive(Debug, Default)]
pub struct EngineState {
    orders: OrderStore,
    instruments: InstrumentTable,
    initial_balances: Balances,
    balances: Balances,
    timeline: Timeline,
    positions: Positions,
}

impl EngineState {
    pub fn new(config: &PaperConfig) -> Self {
        let initial_balances = Balances::from_deposits(&config.deposits());
        Self {
            orders: OrderStore::default(),
            instruments: InstrumentTable::new(config.instruments().iter().cloned()),
            balances: initial_balances.clone(),
            initial_balances,
            timeline: Timeline::default(),
            positions: Positions::default(),
        }
    }

    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    pub fn instrument(&self, symbol: &Symbol) -> Option<Instrument> {
        self.instruments.get(symbol).cloned()
    }

    /// Balances obtained by replaying the whole timeline over the initial deposits.
    pub fn replayed_balances(&self) -> Balances {
        self.timeline.replay_balances(&self.initial_balances)
    }

    /// Stores a new working limit order and queues its first publish.
    pub fn place(
        &mut self,
        instrument: Instrument,
        side: Side,
        quantity: f64,
        price: f64,
        placed_at: i64,
        outbox: &mut Outbox,
    ) -> Order {
        let symbol = instrument.symbol().clone();
        self.instruments.register(instrument);
        let price = self.instruments.normalize_price(&symbol, price);
        let id = self.orders.next_id();

        let order = Order::limit(id, symbol, side, quantity, price, placed_at);
        info!(
            "Placed order {}: {} {} {} @ {}",
            id,
            side,
            quantity,
            order.symbol(),
            price
        );
        self.orders.insert(order.clone());
        outbox.push(StateUpdate::ActiveOrder(order.clone()));
        order
    }

    /// Shifts every matching working order of `symbol` by `step_multiplier` ticks.
    pub fn modify(
        &mut self,
        symbol: &Symbol,
        filter: SideFilter,
        step_multiplier: f64,
        outbox: &mut Outbox,
    ) -> usize {
        let mut modified = 0;
        for id in self.orders.working_ids(symbol, filter) {
            let Some(current) = self.orders.get(id).map(|o| o.price()) else {
                continue;
            };
            let tick = self
                .instruments
                .tick_size(symbol, current)
                .unwrap_or_else(|| default_tick_size(current));
            let price = normalize_to_tick(current + step_multiplier * tick, tick);

            if let Some(order) = self.orders.get_mut(id) {
                if order.reprice(price) {
                    debug!("Order {} repriced {} -> {}", id, current, price);
                    outbox.push(StateUpdate::ActiveOrder(order.clone()));
                    modified += 1;
                }
            }
        }
        modified
    }

    /// Cancels one order. Returns false when it was already terminal.
    pub fn cancel(&mut self, id: OrderId, outbox: &mut Outbox) -> Result<bool> {
        let order = self.orders.get_mut(id).ok_or(PaperError::UnknownOrder(id))?;
        if !order.cancel() {
            return Ok(false);
        }
        info!("Canceled order {} ({} left unfilled)", id, order.remaining());
        outbox.push(StateUpdate::ActiveOrder(order.clone()));
        Ok(true)
    }

    /// Sweeps order `id` through `snapshot` and settles every fill.
    ///
    /// A commission failure stops the sweep with the order's `filled`
    /// already advanced for the failing fill.
    pub fn evaluate(
        &mut self,
        id: OrderId,
        snapshot: &OrderBookSnapshot,
        commission: &dyn CommissionCalculator,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let Some(order) = self.orders.get(id) else {
            return Ok(());
        };
        let fills = sweep(order, snapshot);
        if fills.is_empty() {
            return Ok(());
        }

        let symbol = order.symbol().clone();
        let instrument = self
            .instrument(&symbol)
            .ok_or(PaperError::UnknownInstrument(symbol))?;

        for fill in fills {
            let (side, quantity) = match self.orders.get_mut(id) {
                Some(order) => (order.side(), order.record_fill(fill.quantity)),
                None => break,
            };
            if quantity <= QTY_EPSILON {
                break;
            }
            self.settle(&instrument, fill.price, quantity, side, Some(id), commission, outbox)?;
        }

        if let Some(order) = self.orders.get(id) {
            if order.status() == OrderStatus::Filled {
                info!("Order {} filled", id);
            }
            outbox.push(StateUpdate::ActiveOrder(order.clone()));
        }
        Ok(())
    }

    /// Books one fill: timeline, balance, then the instrument's position.
    #[allow(clippy::too_many_arguments)]
    pub fn settle(
        &mut self,
        instrument: &Instrument,
        price: f64,
        quantity: f64,
        side: Side,
        parent_id: Option<OrderId>,
        commission: &dyn CommissionCalculator,
        outbox: &mut Outbox,
    ) -> Result<Execution> {
        let fee = commission.commission(instrument, price, quantity)?;
        if !fee.is_finite() {
            return Err(CommissionError::NonFinite {
                symbol: instrument.symbol().clone(),
                value: fee,
            }
            .into());
        }

        let execution = Execution::new(
            parent_id,
            instrument,
            side,
            price,
            quantity,
            fee,
            paper_api::model::now_millis(),
        );
        debug!(
            "Settled {} {} {} @ {} (commission {})",
            side,
            quantity,
            instrument.symbol(),
            price,
            fee
        );

        self.timeline.append(execution.clone());
        outbox.push(StateUpdate::TimelineItem(execution.clone()));

        self.balances.apply(&execution);
        outbox.extend(self.balance_updates());

        if let Some(position) = self.recompute(instrument.symbol()) {
            outbox.push(StateUpdate::Position(position));
        }
        Ok(execution)
    }

    /// Rebuilds the position of `symbol` from the timeline and refreshes the cache.
    pub fn recompute(&mut self, symbol: &Symbol) -> Option<Position> {
        let instrument = self.instruments.get(symbol)?;
        let position = portfolio::recompute(instrument, self.timeline.for_symbol(symbol));
        self.positions.update(position.clone());
        Some(position)
    }

    /// Every currency balance shaped as a position record.
    pub fn balance_updates(&self) -> Vec<StateUpdate> {
        self.balances
            .iter()
            .map(|(currency, amount)| StateUpdate::Balance(Position::balance(currency, *amount)))
            .collect()
    }

    /// Every cached position, recomputed first.
    pub fn position_updates(&mut self) -> Vec<StateUpdate> {
        self.positions
            .symbols()
            .iter()
            .filter_map(|symbol| self.recompute(symbol))
            .map(StateUpdate::Position)
            .collect()
    }

    pub fn working_order_updates(&self) -> Vec<StateUpdate> {
        self.orders
            .working()
            .cloned()
            .map(StateUpdate::ActiveOrder)
            .collect()
    }

    pub fn timeline_updates(&self) -> Vec<StateUpdate> {
        self.timeline
            .iter()
            .cloned()
            .map(StateUpdate::TimelineItem)
            .collect()
    }

    pub fn export(&self, exchanges: &[ExchangeInfo], instrument_dictionary: &str) -> TraderState {
        TraderState {
            balances: self.balances.clone(),
            history: self.timeline.iter().cloned().collect(),
            orders: self.orders.working().cloned().collect(),
            positions: self.positions.iter().cloned().collect(),
            exchanges: exchanges.to_vec(),
            instrument_dictionary: instrument_dictionary.to_string(),
        }
    }
}
