//! Contracts for the collaborators the trading core depends on
//!
//! Concrete implementations (feed listeners, RPC clients, databases) live
//! outside this crate; the core only ever talks to these traits.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::errors::{ExecutionError, Result};
use super::types::{
    BotId, MarketSnapshot, Opportunity, OutcomeReport, Position, PositionClosure, TradeOutcome,
    TradeTransaction,
};

/// Callback invoked by a feed for every delivered opportunity
pub type OpportunityHandler = Arc<dyn Fn(Opportunity) + Send + Sync>;

/// Push-based source of new token launches
///
/// Delivery is at-most-once with no replay: anything delivered while nobody
/// is listening is gone.
pub trait OpportunityFeed: Send + Sync {
    /// Begin delivering opportunities to `handler`
    fn listen(&self, handler: OpportunityHandler) -> Result<()>;

    /// Stop delivering opportunities
    fn stop_listening(&self);
}

/// Trait for market data providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current snapshot for the opportunity's token
    ///
    /// May fail transiently; the caller does not retry within the same tick.
    async fn get_snapshot(&self, opportunity: &Opportunity) -> Result<MarketSnapshot>;
}

/// Parameters for a buy on the bonding curve
#[derive(Debug, Clone)]
pub struct BuyParams {
    pub bot_id: BotId,
    pub mint: String,
    pub bonding_curve: String,
    /// SOL to spend
    pub amount: Decimal,
    pub slippage_bps: u32,
    pub metadata: serde_json::Value,
}

/// Parameters for a sell on the bonding curve
#[derive(Debug, Clone)]
pub struct SellParams {
    pub bot_id: BotId,
    pub mint: String,
    pub bonding_curve: String,
    /// Tokens to sell; `None` sells whatever the wallet holds
    pub token_amount: Option<Decimal>,
    pub slippage_bps: u32,
    pub reason: String,
    pub metadata: serde_json::Value,
}

/// Exchange execution client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn buy(&self, params: BuyParams) -> std::result::Result<TradeTransaction, ExecutionError>;

    async fn sell(&self, params: SellParams)
        -> std::result::Result<TradeTransaction, ExecutionError>;
}

/// Wallet balance access
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn get_balance(&self) -> Result<Decimal>;

    /// Apply a signed delta and return the new balance (simulated mode)
    async fn apply_delta(&self, amount: Decimal) -> Result<Decimal>;
}

/// Persistence for open and closed positions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn insert(&self, position: &Position) -> Result<()>;

    async fn close(&self, trade_id: Uuid, closure: &PositionClosure) -> Result<()>;
}

/// Persistence for terminal run outcomes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn insert_outcome(&self, outcome: &TradeOutcome, report: &OutcomeReport) -> Result<()>;
}
