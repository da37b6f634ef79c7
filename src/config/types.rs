//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::common::errors::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-opportunity trading parameters
    #[serde(default)]
    pub trading: TradingConfig,
    /// Intake admission control
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// Process-wide risk limits
    #[serde(default)]
    pub limits: LimitsConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Validate every section that has constraints beyond its types
    pub fn validate(&self) -> Result<()> {
        self.trading.validate()
    }
}

/// Parameters for a single trading state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Poll interval while waiting to buy
    #[serde(default = "default_buy_poll_interval")]
    pub buy_poll_interval_ms: u64,
    /// Poll interval while holding a position; must divide the buy interval
    #[serde(default = "default_sell_poll_interval")]
    pub sell_poll_interval_ms: u64,
    /// Grace window of continued monitoring after an exit decision
    #[serde(default = "default_max_wait_after_decision")]
    pub max_wait_after_decision_ms: u64,
    /// SOL spent per buy
    #[serde(default = "default_buy_amount")]
    pub buy_amount: Decimal,
    /// Slippage tolerance in basis points
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
    /// Upper bound on the salvage sell after a fatal buy error
    #[serde(default = "default_salvage_timeout")]
    pub salvage_timeout_ms: u64,
    /// Simulated mode: balances are tracked locally
    #[serde(default = "default_simulate")]
    pub simulate: bool,
}

impl TradingConfig {
    /// Check poll intervals are non-zero and the buy interval is a multiple of the sell interval
    pub fn validate(&self) -> Result<()> {
        if self.sell_poll_interval_ms == 0 || self.buy_poll_interval_ms == 0 {
            return Err(Error::Configuration(
                "poll intervals must be greater than zero".to_string(),
            ));
        }
        if self.buy_poll_interval_ms % self.sell_poll_interval_ms != 0 {
            return Err(Error::Configuration(format!(
                "buy_poll_interval_ms ({}) must be a multiple of sell_poll_interval_ms ({})",
                self.buy_poll_interval_ms, self.sell_poll_interval_ms
            )));
        }
        if self.buy_amount <= Decimal::ZERO {
            return Err(Error::Configuration(
                "buy_amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            buy_poll_interval_ms: default_buy_poll_interval(),
            sell_poll_interval_ms: default_sell_poll_interval(),
            max_wait_after_decision_ms: default_max_wait_after_decision(),
            buy_amount: default_buy_amount(),
            slippage_bps: default_slippage_bps(),
            salvage_timeout_ms: default_salvage_timeout(),
            simulate: default_simulate(),
        }
    }
}

fn default_buy_poll_interval() -> u64 {
    1000
}

fn default_sell_poll_interval() -> u64 {
    250
}

fn default_max_wait_after_decision() -> u64 {
    5000
}

fn default_buy_amount() -> Decimal {
    dec!(0.05)
}

fn default_slippage_bps() -> u32 {
    500
}

fn default_salvage_timeout() -> u64 {
    10_000
}

fn default_simulate() -> bool {
    true
}

/// Admission control for the opportunity feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Ceiling on concurrently processed opportunities (unset = unbounded)
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

/// Process-wide risk limits enforced by the lifecycle manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Pause intake while this many positions are open
    #[serde(default)]
    pub max_open_positions: Option<u32>,
    /// Stop everything after this many round trips
    #[serde(default)]
    pub max_full_trades: Option<u32>,
    /// Stop everything when the tracked balance falls to this floor
    #[serde(default)]
    pub min_wallet_balance: Option<Decimal>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
