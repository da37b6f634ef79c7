//! PumpSniper Library
//!
//! Trading-execution core for sniping newly launched bonding-curve tokens:
//! admission-controlled intake, one trading state machine per opportunity,
//! and process-wide risk limits coordinated over an event bus.

pub mod admission;
pub mod common;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod session;
pub mod strategy;
pub mod trading;
pub mod wallet;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use admission::AdmissionListener;
pub use common::errors::{Error, ExecutionError, FatalKind, Result};
pub use common::traits::{
    BuyParams, ExecutionClient, MarketDataProvider, OpportunityFeed, OpportunityHandler,
    PositionStore, ResultStore, SellParams, Wallet,
};
pub use common::types::{
    BotId, MarketSnapshot, MonitorAction, MonitorRecord, Opportunity, OutcomeReport, Position,
    PositionClosure, Side, TradeOutcome, TradeTransaction,
};
pub use config::types::AppConfig;
pub use events::{EventBus, StopReason, StopRequest, StopScope};
pub use lifecycle::{LifecycleCounters, LifecycleManager};
pub use session::TradingSession;
pub use strategy::{ExitThresholds, SellDecision, SharedStrategy, Strategy, StrategyFactory};
pub use trading::{DefaultClassifier, ErrorClass, ErrorClassifier, TradingDeps, TradingStateMachine};
pub use wallet::SimulatedWallet;
