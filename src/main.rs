//! PumpSniper - Main Entry Point
//!
//! Loads and validates the trading configuration and reports the limits the
//! trading core will enforce. Feed listeners and execution clients are
//! provided by the embedding application through the library traits.

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pump_sniper::config::load_config;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides settings.log_level
    #[arg(long, env = "SNIPER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Exit after printing the resolved configuration
    #[arg(long)]
    check: bool,
}

fn parse_level(raw: &str) -> Level {
    match raw.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = load_config(Some(&args.config))?;

    // CLI flag wins over the config file; RUST_LOG wins over both
    let level = parse_level(args.log_level.as_deref().unwrap_or(&config.settings.log_level));
    let builder = FmtSubscriber::builder()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    if std::env::var("RUST_LOG").is_ok() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )?;
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?;
    }

    info!("Starting PumpSniper");
    info!("Configuration file: {}", args.config);
    info!(
        buy_poll_interval_ms = config.trading.buy_poll_interval_ms,
        sell_poll_interval_ms = config.trading.sell_poll_interval_ms,
        max_wait_after_decision_ms = config.trading.max_wait_after_decision_ms,
        buy_amount = %config.trading.buy_amount,
        slippage_bps = config.trading.slippage_bps,
        simulate = config.trading.simulate,
        "Trading configuration"
    );
    info!(
        max_concurrent = ?config.admission.max_concurrent,
        max_open_positions = ?config.limits.max_open_positions,
        max_full_trades = ?config.limits.max_full_trades,
        min_wallet_balance = ?config.limits.min_wallet_balance,
        "Risk limits"
    );
    if config.limits == Default::default() && config.admission.max_concurrent.is_none() {
        warn!("No limits configured; intake and exposure are unbounded");
    }

    if args.check {
        return Ok(());
    }

    // Keep the application running
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, cleaning up...");

    Ok(())
}
