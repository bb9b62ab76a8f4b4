//! A synthetic order-book source.
//!
//! Each subscribed instrument gets a tokio task that walks a mid price
//! randomly and streams a symmetric ladder around it.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use paper_api::model::instrument::{default_tick_size, normalize_to_tick};
use paper_api::{BookLevel, BookUpdate, Instrument, MarketDataSource, OrderBookSnapshot, SnapshotSink, Symbol};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

fn default_interval_ms() -> u64 {
    500
}

fn default_depth() -> usize {
    5
}

fn default_spread() -> f64 {
    0.002
}

fn default_level_volume() -> f64 {
    100.0
}

fn default_volatility() -> f64 {
    0.01
}

fn default_start_price() -> f64 {
    100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Delay between two snapshots of the same instrument.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Levels per side.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Relative distance between best bid and best ask.
    #[serde(default = "default_spread")]
    pub spread: f64,
    /// Volume resting on the best level; deeper levels hold multiples of it.
    #[serde(default = "default_level_volume")]
    pub level_volume: f64,
    /// Largest relative move of the mid price per snapshot.
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    /// Starting mid price per symbol. Matched case-insensitively, since the
    /// `config` crate lowercases table keys.
    #[serde(default)]
    pub start_prices: BTreeMap<String, f64>,
    /// Starting mid price for symbols missing from `start_prices`.
    #[serde(default = "default_start_price")]
    pub default_start_price: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            depth: default_depth(),
            spread: default_spread(),
            level_volume: default_level_volume(),
            volatility: default_volatility(),
            start_prices: BTreeMap::new(),
            default_start_price: default_start_price(),
        }
    }
}

impl FeedConfig {
    pub fn start_price(&self, symbol: &Symbol) -> f64 {
        self.start_prices
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(symbol.as_str()))
            .map(|(_, price)| *price)
            .unwrap_or(self.default_start_price)
    }
}

/// Builds a ladder of `config.depth` levels per side around `mid`.
pub fn ladder(mid: f64, tick: f64, config: &FeedConfig) -> OrderBookSnapshot {
    let half_spread = (mid * config.spread / 2.0).max(tick);
    let best_bid = normalize_to_tick(mid - half_spread, tick);
    let best_ask = normalize_to_tick(mid + half_spread, tick);

    let mut bids = Vec::with_capacity(config.depth);
    let mut asks = Vec::with_capacity(config.depth);
    for i in 0..config.depth {
        let offset = tick * i as f64;
        let volume = config.level_volume * (i + 1) as f64;
        bids.push(BookLevel::new(normalize_to_tick(best_bid - offset, tick), volume));
        asks.push(BookLevel::new(normalize_to_tick(best_ask + offset, tick), volume));
    }
    OrderBookSnapshot::new(bids, asks)
}

pub struct SyntheticFeed {
    config: FeedConfig,
    tasks: Mutex<HashMap<Symbol, JoinHandle<()>>>,
}

impl SyntheticFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<Symbol, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MarketDataSource for SyntheticFeed {
    async fn subscribe(&self, instrument: &Instrument, sink: SnapshotSink) -> Result<()> {
        let symbol = instrument.symbol().clone();
        let config = self.config.clone();
        let mut mid = config.start_price(&symbol);
        let tick = instrument
            .tick_size()
            .unwrap_or_else(|| default_tick_size(mid));
        let interval = Duration::from_millis(config.interval_ms);

        info!("[SyntheticFeed] Streaming {} from {:.4}", symbol, mid);
        let task_symbol = symbol.clone();
        let handle = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            loop {
                let snapshot = ladder(mid, tick, &config);
                if sink.send(BookUpdate::new(task_symbol.clone(), snapshot)).is_err() {
                    debug!("[SyntheticFeed] Sink for {} closed", task_symbol);
                    break;
                }
                tokio::time::sleep(interval).await;

                let change = if config.volatility > 0.0 {
                    rng.gen_range(-config.volatility..config.volatility)
                } else {
                    0.0
                };
                mid = (mid * (1.0 + change)).max(tick);
            }
        });

        if let Some(previous) = self.tasks().insert(symbol, handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn unsubscribe(&self, instrument: &Instrument) -> Result<()> {
        if let Some(handle) = self.tasks().remove(instrument.symbol()) {
            info!("[SyntheticFeed] Stopped {}", instrument.symbol());
            handle.abort();
        }
        Ok(())
    }
}

impl Drop for SyntheticFeed {
    fn drop(&mut self) {
        for (_, handle) in self.tasks().drain() {
            handle.abort();
        }
    }
}
