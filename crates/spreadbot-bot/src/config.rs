//! Application configuration.
//!
//! Loaded once from TOML at startup. Every field has a default; `validate`
//! rejects values the agent cannot run with before anything is started.

use std::collections::BTreeMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use spreadbot_core::{TradingPair, VenueId};
use spreadbot_executor::DEFAULT_FILL_DEDUPE_CAPACITY;
use spreadbot_mm::StrategyConfig;

use crate::error::{AppError, AppResult};

/// Scheduling and collaborator call bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cycle interval in whole seconds. Boundaries align to the Unix epoch.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Bound on every collaborator call. Must not exceed the interval.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Read the venue's open orders before the first tick.
    #[serde(default = "default_true")]
    pub reconcile_on_start: bool,

    /// Log a status report every N cycles (0 = only at shutdown).
    #[serde(default = "default_status_every_cycles")]
    pub status_every_cycles: u64,

    /// Fill ids remembered for duplicate detection.
    #[serde(default = "default_fill_dedupe_capacity")]
    pub fill_dedupe_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            call_timeout_ms: default_call_timeout_ms(),
            reconcile_on_start: true,
            status_every_cycles: default_status_every_cycles(),
            fill_dedupe_capacity: default_fill_dedupe_capacity(),
        }
    }
}

/// Parameters for the external candle/indicator feed.
///
/// Passed through to whatever publishes signals; the core only uses the
/// published values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Use the signal-skewed spread model instead of the fixed spread.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,

    /// Candles in the indicator lookback.
    #[serde(default = "default_candles_length")]
    pub candles_length: usize,

    /// Candles retained by the feed.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            candle_interval: default_candle_interval(),
            candles_length: default_candles_length(),
            max_records: default_max_records(),
        }
    }
}

/// Starting state of the paper venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_paper_reference_price")]
    pub reference_price: Decimal,

    /// Free balance per asset.
    #[serde(default = "default_paper_balances")]
    pub balances: BTreeMap<String, Decimal>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            reference_price: default_paper_reference_price(),
            balances: default_paper_balances(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pair to quote, `BASE-QUOTE`.
    #[serde(default = "default_pair")]
    pub pair: String,

    /// Venue (exchange connector) identifier.
    #[serde(default = "default_venue")]
    pub venue: String,

    #[serde(default)]
    pub strategy: StrategyConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub signal: SignalConfig,

    #[serde(default)]
    pub paper: PaperConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pair: default_pair(),
            venue: default_venue(),
            strategy: StrategyConfig::default(),
            scheduler: SchedulerConfig::default(),
            signal: SignalConfig::default(),
            paper: PaperConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn trading_pair(&self) -> AppResult<TradingPair> {
        self.pair
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid pair '{}': {e}", self.pair)))
    }

    pub fn venue_id(&self) -> VenueId {
        VenueId::new(self.venue.trim())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.refresh_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.scheduler.call_timeout_ms)
    }

    /// Reject configurations the agent must not start with.
    pub fn validate(&self) -> AppResult<()> {
        self.trading_pair()?;

        if self.venue_id().is_empty() {
            return Err(AppError::Config("venue must not be empty".to_string()));
        }

        let strategy = &self.strategy;
        if strategy.order_amount <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "order_amount must be positive, got {}",
                strategy.order_amount
            )));
        }
        for (name, value) in [
            ("bid_spread", strategy.bid_spread),
            ("ask_spread", strategy.ask_spread),
            ("max_spread", strategy.max_spread),
        ] {
            if value <= Decimal::ZERO || value >= Decimal::ONE {
                return Err(AppError::Config(format!(
                    "{name} must be in (0, 1), got {value}"
                )));
            }
        }
        if self.signal.enabled
            && (strategy.bid_spread > strategy.max_spread
                || strategy.ask_spread > strategy.max_spread)
        {
            return Err(AppError::Config(format!(
                "bid_spread and ask_spread must not exceed max_spread ({}) when signals are enabled",
                strategy.max_spread
            )));
        }
        if strategy.price_tick < Decimal::ZERO || strategy.lot_size < Decimal::ZERO {
            return Err(AppError::Config(
                "price_tick and lot_size must not be negative".to_string(),
            ));
        }

        let scheduler = &self.scheduler;
        if scheduler.refresh_interval_secs == 0 {
            return Err(AppError::Config(
                "refresh_interval_secs must be positive".to_string(),
            ));
        }
        if scheduler.call_timeout_ms == 0 || self.call_timeout() > self.refresh_interval() {
            return Err(AppError::Config(format!(
                "call_timeout_ms must be in (0, {}], got {}",
                scheduler.refresh_interval_secs * 1000,
                scheduler.call_timeout_ms
            )));
        }

        if self.signal.enabled && self.signal.candles_length == 0 {
            return Err(AppError::Config(
                "candles_length must be positive when signals are enabled".to_string(),
            ));
        }

        if self.paper.reference_price <= Decimal::ZERO {
            return Err(AppError::Config(
                "paper.reference_price must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_pair() -> String {
    "ETH-USDT".to_string()
}
fn default_venue() -> String {
    "okx".to_string()
}
fn default_refresh_interval_secs() -> u64 {
    20
}
fn default_call_timeout_ms() -> u64 {
    5_000
}
fn default_status_every_cycles() -> u64 {
    10
}
fn default_fill_dedupe_capacity() -> usize {
    DEFAULT_FILL_DEDUPE_CAPACITY
}
fn default_candle_interval() -> String {
    "1m".to_string()
}
fn default_candles_length() -> usize {
    30
}
fn default_max_records() -> usize {
    1000
}
fn default_paper_reference_price() -> Decimal {
    Decimal::new(2000, 0)
}
fn default_paper_balances() -> BTreeMap<String, Decimal> {
    BTreeMap::from([
        ("ETH".to_string(), Decimal::ONE),
        ("USDT".to_string(), Decimal::new(1000, 0)),
    ])
}
