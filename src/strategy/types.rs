use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{MarketSnapshot, Position};

/// Strategy answer for an open position
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SellDecision {
    pub sell: bool,
    /// Why the strategy wants out (stop_loss, take_profit, ...)
    pub reason: Option<String>,
}

impl SellDecision {
    /// Keep holding
    pub fn hold() -> Self {
        Self::default()
    }

    /// Sell with a reason
    pub fn sell(reason: impl Into<String>) -> Self {
        Self {
            sell: true,
            reason: Some(reason.into()),
        }
    }

    pub fn reason_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.reason.as_deref().unwrap_or(fallback)
    }
}

/// Exit thresholds a strategy attaches to a position at buy time
///
/// All values are percentages (10 = 10%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExitThresholds {
    pub stop_loss_percent: Option<Decimal>,
    pub take_profit_percent: Option<Decimal>,
    pub trailing_stop_percent: Option<Decimal>,
}

impl ExitThresholds {
    pub fn with_stop_loss(mut self, percent: Decimal) -> Self {
        self.stop_loss_percent = Some(percent);
        self
    }

    pub fn with_take_profit(mut self, percent: Decimal) -> Self {
        self.take_profit_percent = Some(percent);
        self
    }

    pub fn with_trailing_stop(mut self, percent: Decimal) -> Self {
        self.trailing_stop_percent = Some(percent);
        self
    }

    /// Evaluate the thresholds recorded on `position` against the snapshot
    ///
    /// Returns the name of the first threshold hit. Strategies can delegate
    /// their `should_sell` to this when they have no extra exit logic.
    pub fn triggered(position: &Position, snapshot: &MarketSnapshot) -> Option<&'static str> {
        let change = position.change_percent(snapshot.price);

        if let Some(stop_loss) = position.stop_loss_percent {
            if change <= -stop_loss {
                return Some("stop_loss");
            }
        }
        if let Some(take_profit) = position.take_profit_percent {
            if change >= take_profit {
                return Some("take_profit");
            }
        }
        if let Some(trailing) = position.trailing_stop_percent {
            // Only trail once the position has been in profit
            if position.peak_price > position.entry_price
                && position.drawdown_percent(snapshot.price) >= trailing
            {
                return Some("trailing_stop");
            }
        }
        None
    }
}
