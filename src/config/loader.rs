//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::{AdmissionConfig, AppConfig, AppSettings, LimitsConfig, TradingConfig};
use crate::common::errors::{Error, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with SNIPER__)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("SNIPER")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let defaults = TradingConfig::default();
    let trading = TradingConfig {
        buy_poll_interval_ms: env_parse("SNIPER_BUY_POLL_INTERVAL_MS")?
            .unwrap_or(defaults.buy_poll_interval_ms),
        sell_poll_interval_ms: env_parse("SNIPER_SELL_POLL_INTERVAL_MS")?
            .unwrap_or(defaults.sell_poll_interval_ms),
        max_wait_after_decision_ms: env_parse("SNIPER_MAX_WAIT_AFTER_DECISION_MS")?
            .unwrap_or(defaults.max_wait_after_decision_ms),
        buy_amount: env_parse("SNIPER_BUY_AMOUNT")?.unwrap_or(defaults.buy_amount),
        slippage_bps: env_parse("SNIPER_SLIPPAGE_BPS")?.unwrap_or(defaults.slippage_bps),
        salvage_timeout_ms: env_parse("SNIPER_SALVAGE_TIMEOUT_MS")?
            .unwrap_or(defaults.salvage_timeout_ms),
        simulate: env_parse("SNIPER_SIMULATE")?.unwrap_or(defaults.simulate),
    };

    let config = AppConfig {
        trading,
        admission: AdmissionConfig {
            max_concurrent: env_parse("SNIPER_MAX_CONCURRENT")?,
        },
        limits: LimitsConfig {
            max_open_positions: env_parse("SNIPER_MAX_OPEN_POSITIONS")?,
            max_full_trades: env_parse("SNIPER_MAX_FULL_TRADES")?,
            min_wallet_balance: env_parse("SNIPER_MIN_WALLET_BALANCE")?,
        },
        settings: AppSettings {
            log_level: std::env::var("SNIPER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        },
    };
    config.validate()?;
    Ok(config)
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Configuration(format!("{key}: {e}"))),
        Err(_) => Ok(None),
    }
}
