use serde::{Deserialize, Serialize};

use crate::common::types::BotId;

/// Why a stop was requested
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxOpenPositions,
    MinWalletBalance,
    MaxFullTrades,
    InsufficientFunds,
    Shutdown,
    Other(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::MaxOpenPositions => write!(f, "max_open_positions"),
            StopReason::MinWalletBalance => write!(f, "min_wallet_balance"),
            StopReason::MaxFullTrades => write!(f, "max_full_trades"),
            StopReason::InsufficientFunds => write!(f, "insufficient_funds"),
            StopReason::Shutdown => write!(f, "shutdown"),
            StopReason::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Who a stop request is aimed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopScope {
    /// Pause intake only; running state machines are untouched
    Intake,
    /// Cancel every running state machine except the excluded ones
    All { exclude: Vec<BotId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    pub reason: StopReason,
    pub scope: StopScope,
}

impl StopRequest {
    /// Intake-only stop
    pub fn scoped(reason: StopReason) -> Self {
        Self {
            reason,
            scope: StopScope::Intake,
        }
    }

    /// Stop broadcast to every running state machine
    pub fn unscoped(reason: StopReason) -> Self {
        Self {
            reason,
            scope: StopScope::All {
                exclude: Vec::new(),
            },
        }
    }

    /// Leave `bot_id` out of an unscoped stop
    pub fn excluding(mut self, bot_id: BotId) -> Self {
        if let StopScope::All { exclude } = &mut self.scope {
            exclude.push(bot_id);
        }
        self
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self.scope, StopScope::Intake)
    }

    /// Should the state machine `bot_id` cancel on this request?
    pub fn applies_to(&self, bot_id: BotId) -> bool {
        match &self.scope {
            StopScope::Intake => false,
            StopScope::All { exclude } => !exclude.contains(&bot_id),
        }
    }
}
