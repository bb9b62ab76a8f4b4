use crate::error::Result;
use crate::exchange::fees::FeeSchedule;
use crate::gateway::synthetic::FeedConfig;
use paper_api::{ExchangeInfo, Instrument};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

fn default_refresh_interval_ms() -> u64 {
    5_000
}

fn default_instrument_dictionary() -> String {
    "default".to_string()
}

/// Initial cash for one currency.
///
/// Deposits are a list rather than a table because the `config` crate
/// lowercases table keys, and currency codes are case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub currency: String,
    pub amount: f64,
}

/// Configuration of one paper trader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Initial cash per currency. Repeated currencies add up.
    #[serde(default)]
    deposits: Vec<Deposit>,

    /// Fee schedule used as the commission calculator.
    #[serde(default)]
    commission: FeeSchedule,

    /// Slippage coefficient for market orders. Market orders are disabled, so nothing reads it.
    #[serde(default)]
    market_order_coefficient: f64,

    /// Identifier of the instrument dictionary the instrument table was resolved from.
    #[serde(default = "default_instrument_dictionary")]
    instrument_dictionary: String,

    /// Instruments known up front. Others are registered when first traded.
    #[serde(default)]
    instruments: Vec<Instrument>,

    /// Static venue and broker metadata.
    #[serde(default)]
    exchanges: Vec<ExchangeInfo>,

    /// Upper bound on the wait for a first snapshot. Unbounded when absent.
    #[serde(default)]
    snapshot_timeout_ms: Option<u64>,

    /// Period of the balance and position refresh broadcast.
    #[serde(default = "default_refresh_interval_ms")]
    refresh_interval_ms: u64,

    /// Settings of the synthetic market-data feed used by the binary.
    #[serde(default)]
    feed: FeedConfig,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            deposits: Vec::new(),
            commission: FeeSchedule::default(),
            market_order_coefficient: 0.0,
            instrument_dictionary: default_instrument_dictionary(),
            instruments: Vec::new(),
            exchanges: Vec::new(),
            snapshot_timeout_ms: None,
            refresh_interval_ms: default_refresh_interval_ms(),
            feed: FeedConfig::default(),
        }
    }
}

impl PaperConfig {
    /// Loads the configuration from `path` (any format the `config` crate
    /// recognises by extension), then applies `PAPER__`-prefixed environment
    /// overrides such as `PAPER__SNAPSHOT_TIMEOUT_MS=2000`.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("PAPER").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn with_deposit(mut self, currency: impl Into<String>, amount: f64) -> Self {
        self.deposits.push(Deposit {
            currency: currency.into(),
            amount,
        });
        self
    }

    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.instruments.push(instrument);
        self
    }

    pub fn with_snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Initial cash per currency, duplicates summed.
    pub fn deposits(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for deposit in &self.deposits {
            *totals.entry(deposit.currency.clone()).or_insert(0.0) += deposit.amount;
        }
        totals
    }

    pub fn commission(&self) -> &FeeSchedule {
        &self.commission
    }

    pub fn market_order_coefficient(&self) -> f64 {
        self.market_order_coefficient
    }

    pub fn instrument_dictionary(&self) -> &str {
        &self.instrument_dictionary
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn exchanges(&self) -> &[ExchangeInfo] {
        &self.exchanges
    }

    pub fn snapshot_timeout(&self) -> Option<Duration> {
        self.snapshot_timeout_ms.map(Duration::from_millis)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn feed(&self) -> &FeedConfig {
        &self.feed
    }
}
