use paper_api::{Execution, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-currency cash balances.
///
/// This is the running total itself: it moves once per settled execution and
/// is never rebuilt from the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances {
    accounts: BTreeMap<String, f64>,
}

impl Balances {
    pub fn from_deposits<'a>(deposits: impl IntoIterator<Item = (&'a String, &'a f64)>) -> Self {
        let mut balances = Self::default();
        for (currency, amount) in deposits {
            balances.deposit(currency, *amount);
        }
        balances
    }

    pub fn get_balance(&self, currency: &str) -> f64 {
        self.accounts.get(currency).copied().unwrap_or(0.0)
    }

    pub fn deposit(&mut self, currency: &str, amount: f64) {
        *self.accounts.entry(currency.to_string()).or_insert(0.0) += amount;
    }

    pub fn withdraw(&mut self, currency: &str, amount: f64) {
        *self.accounts.entry(currency.to_string()).or_insert(0.0) -= amount;
    }

    /// Books the cash effect of one execution against its currency.
    pub fn apply(&mut self, execution: &Execution) {
        let delta = execution.cash_delta();
        if delta >= 0.0 {
            self.deposit(execution.currency(), delta);
        } else {
            self.withdraw(execution.currency(), -delta);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.accounts.iter()
    }
}

/// Append-only log of executions, in the order they were settled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    items: Vec<Execution>,
}

impl Timeline {
    pub fn append(&mut self, execution: Execution) {
        self.items.push(execution);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Execution> {
        self.items.iter()
    }

    /// Executions of one instrument, oldest first.
    pub fn for_symbol<'a>(&'a self, symbol: &'a Symbol) -> impl Iterator<Item = &'a Execution> {
        self.items.iter().filter(move |e| e.symbol() == symbol)
    }

    /// Rebuilds balances by applying every execution to `initial`.
    pub fn replay_balances(&self, initial: &Balances) -> Balances {
        let mut balances = initial.clone();
        for execution in &self.items {
            balances.apply(execution);
        }
        balances
    }
}
