use std::sync::Arc;

use crate::common::types::{MarketSnapshot, Position};
use crate::strategy::types::{ExitThresholds, SellDecision};

/// Core strategy trait
///
/// Strategies look at a market snapshot (and the open position, if any) and
/// answer three questions: buy now, sell now, or give up on this token.
///
/// # Implementation Notes
///
/// - Every method must be pure and fast - no I/O, no side effects
/// - A fresh strategy instance is created per opportunity, so any internal
///   state never leaks between tokens
/// - Sizing is not the strategy's concern; the state machine buys a fixed
///   configured amount
///
/// # Example
///
/// ```ignore
/// struct CurveProgress {
///     min_progress: Decimal,
/// }
///
/// impl Strategy for CurveProgress {
///     fn name(&self) -> &str { "curve_progress" }
///
///     fn should_buy(&self, snapshot: &MarketSnapshot) -> bool {
///         snapshot.bonding_curve_progress >= self.min_progress
///     }
///
///     fn should_sell(&self, position: &Position, snapshot: &MarketSnapshot) -> SellDecision {
///         match ExitThresholds::triggered(position, snapshot) {
///             Some(reason) => SellDecision::sell(reason),
///             None => SellDecision::hold(),
///         }
///     }
///
///     fn should_exit(&self, _position: Option<&Position>, snapshot: &MarketSnapshot) -> bool {
///         snapshot.top_holders_percent > dec!(60)
///     }
/// }
/// ```
pub trait Strategy: Send + Sync {
    /// Unique identifier for this strategy
    fn name(&self) -> &str;

    /// Enter a position at this snapshot?
    fn should_buy(&self, snapshot: &MarketSnapshot) -> bool;

    /// Close the open position at this snapshot?
    fn should_sell(&self, position: &Position, snapshot: &MarketSnapshot) -> SellDecision;

    /// Stop monitoring this token?
    ///
    /// With an open position this is only advisory; the position is held
    /// until `should_sell` fires.
    fn should_exit(&self, position: Option<&Position>, snapshot: &MarketSnapshot) -> bool;

    /// Thresholds recorded on the position when a buy succeeds
    ///
    /// Default implementation records none.
    fn exit_thresholds(&self, _snapshot: &MarketSnapshot) -> ExitThresholds {
        ExitThresholds::default()
    }

    /// Metadata attached to every trade this strategy triggers
    fn metadata(&self) -> serde_json::Value {
        serde_json::json!({ "strategy": self.name() })
    }
}

/// Shared strategy for dynamic dispatch
pub type SharedStrategy = Arc<dyn Strategy>;

/// Creates one strategy instance per admitted opportunity
pub type StrategyFactory = Arc<dyn Fn() -> SharedStrategy + Send + Sync>;
