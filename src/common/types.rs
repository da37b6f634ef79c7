//! Data model shared by the trading core

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one state-machine run ("bot")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotId(Uuid);

impl BotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BotId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for BotId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A newly launched token delivered by the opportunity feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Token mint address
    pub mint: String,
    /// Creator wallet address
    pub creator: String,
    /// Bonding curve account
    pub bonding_curve: String,
    /// Associated token account of the bonding curve
    #[serde(default)]
    pub associated_bonding_curve: Option<String>,
    pub name: String,
    pub symbol: String,
    /// When the token was created on-chain
    pub created_at: DateTime<Utc>,
}

/// Point-in-time market read for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub mint: String,
    /// Price per token in SOL
    pub price: Decimal,
    /// Market cap in SOL
    pub market_cap: Decimal,
    /// Bonding curve fill (0 to 100)
    pub bonding_curve_progress: Decimal,
    /// Share of supply held by the top holders (0 to 100)
    pub top_holders_percent: Decimal,
    #[serde(default)]
    pub holder_count: u32,
    pub taken_at: DateTime<Utc>,
}

/// Immutable record of one executed buy or sell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTransaction {
    pub id: Uuid,
    pub side: Side,
    pub mint: String,
    /// Token amount bought or sold
    pub token_amount: Decimal,
    /// Execution price per token in SOL
    pub price: Decimal,
    /// SOL amount before fees
    pub gross_amount: Decimal,
    /// Network + platform fees in SOL
    pub fees: Decimal,
    /// SOL actually spent (buy) or received (sell), always non-negative
    pub net_amount: Decimal,
    pub signature: String,
    /// Free-form strategy metadata attached at decision time
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub executed_at: DateTime<Utc>,
}

impl TradeTransaction {
    /// Signed effect on the wallet balance: negative for buys, positive for sells
    pub fn balance_delta(&self) -> Decimal {
        match self.side {
            Side::Buy => -self.net_amount,
            Side::Sell => self.net_amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Open exposure created by a buy and owned by the run that issued it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Id of the buy transaction that opened this position
    pub trade_id: Uuid,
    pub bot_id: BotId,
    pub mint: String,
    pub entry_price: Decimal,
    pub token_amount: Decimal,
    /// SOL spent to open, fees included
    pub cost: Decimal,
    pub stop_loss_percent: Option<Decimal>,
    pub take_profit_percent: Option<Decimal>,
    pub trailing_stop_percent: Option<Decimal>,
    /// Highest price observed while open
    pub peak_price: Decimal,
    pub status: PositionStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Unrealized change of `price` against entry, in percent
    pub fn change_percent(&self, price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        (price - self.entry_price) / self.entry_price * Decimal::ONE_HUNDRED
    }

    /// Drawdown of `price` from the peak, in percent
    pub fn drawdown_percent(&self, price: Decimal) -> Decimal {
        if self.peak_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.peak_price - price) / self.peak_price * Decimal::ONE_HUNDRED
    }

    pub(crate) fn observe(&mut self, price: Decimal) {
        if price > self.peak_price {
            self.peak_price = price;
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

/// Details recorded when a position is closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionClosure {
    pub exit_price: Decimal,
    pub realized_pnl: Decimal,
    pub reason: String,
    pub signature: String,
    pub closed_at: DateTime<Utc>,
}

/// What happened on one monitoring tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "detail", rename_all = "snake_case")]
pub enum MonitorAction {
    Observed,
    BuySignal,
    Bought,
    BuyFailed(String),
    SellSignal(String),
    SellFailed(String),
    Sold,
    ExitSignal,
    ExitIgnored,
    Cancelled,
    SnapshotFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub tick: u64,
    pub at: DateTime<Utc>,
    pub snapshot: Option<MarketSnapshot>,
    pub action: MonitorAction,
}

/// Why a run ended without a round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Strategy signalled exit before any buy
    StrategyExit,
    /// Cooperative cancel observed with no open position
    Stopped,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::StrategyExit => write!(f, "strategy_exit"),
            ExitReason::Stopped => write!(f, "stopped"),
        }
    }
}

/// A finished buy/sell round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTrade {
    pub bot_id: BotId,
    pub mint: String,
    pub buy: TradeTransaction,
    pub sell: TradeTransaction,
    /// `sell.net_amount - buy.net_amount`
    pub realized_pnl: Decimal,
    pub sell_reason: String,
    pub history: Vec<MonitorRecord>,
}

/// A run that ended without opening a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitedRun {
    pub bot_id: BotId,
    pub mint: String,
    pub reason: ExitReason,
    pub history: Vec<MonitorRecord>,
}

/// Terminal result of one state-machine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradeOutcome {
    Completed(CompletedTrade),
    Exited(ExitedRun),
}

impl TradeOutcome {
    pub fn completed(
        bot_id: BotId,
        buy: TradeTransaction,
        sell: TradeTransaction,
        sell_reason: impl Into<String>,
        history: Vec<MonitorRecord>,
    ) -> Self {
        let realized_pnl = sell.net_amount - buy.net_amount;
        Self::Completed(CompletedTrade {
            bot_id,
            mint: buy.mint.clone(),
            buy,
            sell,
            realized_pnl,
            sell_reason: sell_reason.into(),
            history,
        })
    }

    pub fn exited(
        bot_id: BotId,
        mint: impl Into<String>,
        reason: ExitReason,
        history: Vec<MonitorRecord>,
    ) -> Self {
        Self::Exited(ExitedRun {
            bot_id,
            mint: mint.into(),
            reason,
            history,
        })
    }

    pub fn bot_id(&self) -> BotId {
        match self {
            TradeOutcome::Completed(t) => t.bot_id,
            TradeOutcome::Exited(r) => r.bot_id,
        }
    }

    pub fn mint(&self) -> &str {
        match self {
            TradeOutcome::Completed(t) => &t.mint,
            TradeOutcome::Exited(r) => &r.mint,
        }
    }

    pub fn history(&self) -> &[MonitorRecord] {
        match self {
            TradeOutcome::Completed(t) => &t.history,
            TradeOutcome::Exited(r) => &r.history,
        }
    }

    /// Realized P&L, zero when no round trip happened
    pub fn realized_pnl(&self) -> Decimal {
        match self {
            TradeOutcome::Completed(t) => t.realized_pnl,
            TradeOutcome::Exited(_) => Decimal::ZERO,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TradeOutcome::Completed(_))
    }
}

/// Summary persisted alongside an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub bot_id: BotId,
    pub mint: String,
    pub ticks: u64,
    pub duration_ms: u64,
    pub realized_pnl: Decimal,
}
