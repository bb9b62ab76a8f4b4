use paper_api::{Order, OrderId, SideFilter, Symbol};
use std::collections::{BTreeMap, HashMap};

/// Owns every order the trader has issued.
///
/// Each order is stored exactly once, keyed by id. The per-instrument lists
/// are index views holding ids in placement order, so a status change is seen
/// by every view at once.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: BTreeMap<OrderId, Order>,
    by_symbol: HashMap<Symbol, Vec<OrderId>>,
    last_id: u64,
}

impl OrderStore {
    /// Issues the next order id. Ids start at 1 and are never reused.
    pub fn next_id(&mut self) -> OrderId {
        self.last_id += 1;
        OrderId::new(self.last_id)
    }

    pub fn insert(&mut self, order: Order) {
        self.by_symbol
            .entry(order.symbol().clone())
            .or_default()
            .push(order.id());
        self.orders.insert(order.id(), order);
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }

    /// All orders of `symbol`, in placement order.
    pub fn for_symbol<'a>(&'a self, symbol: &Symbol) -> impl Iterator<Item = &'a Order> + 'a {
        self.by_symbol
            .get(symbol)
            .into_iter()
            .flatten()
            .filter_map(|id| self.orders.get(id))
    }

    /// Ids of the working orders of `symbol` whose side passes `filter`.
    pub fn working_ids(&self, symbol: &Symbol, filter: SideFilter) -> Vec<OrderId> {
        self.for_symbol(symbol)
            .filter(|o| o.is_working() && filter.matches(o.side()))
            .map(|o| o.id())
            .collect()
    }

    pub fn has_working(&self, symbol: &Symbol) -> bool {
        self.for_symbol(symbol).any(|o| o.is_working())
    }

    /// Every working order across all instruments, by id.
    pub fn working(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| o.is_working())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
