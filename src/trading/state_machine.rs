//! Per-opportunity trading state machine
//!
//! ```text
//! Idle ─▶ Monitoring(pre-buy) ─▶ Buying ─▶ Monitoring(post-buy) ─▶ Selling ─▶ Settled
//!              │                   │                                 │
//!              ▼                   ▼                                 └─(error)─▶ Monitoring(post-buy)
//!          Cancelled             Failed
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::classify::{DefaultClassifier, ErrorClass, ErrorClassifier};
use crate::common::errors::{Error, Result};
use crate::common::traits::{
    BuyParams, ExecutionClient, MarketDataProvider, PositionStore, ResultStore, SellParams,
};
use crate::common::types::{
    BotId, ExitReason, MarketSnapshot, MonitorAction, MonitorRecord, Opportunity, OutcomeReport,
    Position, PositionClosure, PositionStatus, TradeOutcome, TradeTransaction,
};
use crate::config::types::TradingConfig;
use crate::events::{EventBus, SubscriptionId};
use crate::strategy::{SharedStrategy, Strategy};

/// Sell reason used when a cancel forces an open position out
const STOPPED_SELL_REASON: &str = "stopped";

/// External collaborators a state machine talks to
#[derive(Clone)]
pub struct TradingDeps {
    pub market_data: Arc<dyn MarketDataProvider>,
    pub execution: Arc<dyn ExecutionClient>,
    pub positions: Arc<dyn PositionStore>,
    pub results: Arc<dyn ResultStore>,
    pub classifier: Arc<dyn ErrorClassifier>,
}

impl TradingDeps {
    /// Deps with the [`DefaultClassifier`]
    pub fn new(
        market_data: Arc<dyn MarketDataProvider>,
        execution: Arc<dyn ExecutionClient>,
        positions: Arc<dyn PositionStore>,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            market_data,
            execution,
            positions,
            results,
            classifier: Arc::new(DefaultClassifier),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }
}

/// Drives one opportunity from first snapshot to a terminal outcome
///
/// An open position is never abandoned: once bought, the machine keeps
/// monitoring and retrying the sell until it lands, even after a cancel.
pub struct TradingStateMachine {
    config: TradingConfig,
    bus: Arc<EventBus>,
    deps: TradingDeps,
    running: AtomicBool,
    cancelled: Arc<AtomicBool>,
}

/// Mutable state of one run
struct RunState<'a> {
    bot_id: BotId,
    opportunity: &'a Opportunity,
    strategy: &'a dyn Strategy,
    tick: u64,
    interval: Duration,
    position: Option<Position>,
    buy: Option<TradeTransaction>,
    exit_deadline: Option<Instant>,
    history: Vec<MonitorRecord>,
    started: Instant,
}

impl RunState<'_> {
    /// An exit was decided and its grace window is over
    fn grace_elapsed(&self) -> bool {
        self.exit_deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn record(&mut self, snapshot: Option<&MarketSnapshot>, action: MonitorAction) {
        self.history.push(MonitorRecord {
            tick: self.tick,
            at: Utc::now(),
            snapshot: snapshot.cloned(),
            action,
        });
    }
}

/// Clears the running flag and the stop subscription however the run ends
struct RunGuard<'a> {
    running: &'a AtomicBool,
    bus: &'a EventBus,
    subscription: SubscriptionId,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.subscription);
        self.running.store(false, Ordering::SeqCst);
    }
}

impl TradingStateMachine {
    /// Create a state machine; fails when the poll intervals do not line up
    pub fn new(config: TradingConfig, bus: Arc<EventBus>, deps: TradingDeps) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bus,
            deps,
            running: AtomicBool::new(false),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Request a cooperative stop, observed at the top of the next tick
    ///
    /// Without a position the run ends with [`ExitReason::Stopped`]; with one,
    /// the run sells first. The flag stays set for the life of the instance.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!("Cancel requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run until a terminal outcome
    ///
    /// Resolves with a [`TradeOutcome`] whenever monitoring reaches an end;
    /// fails only on a fatal buy error or when a previous run is unsettled.
    #[instrument(skip(self, opportunity, strategy), fields(mint = %opportunity.mint, strategy = strategy.name()))]
    pub async fn run(
        &self,
        bot_id: BotId,
        opportunity: &Opportunity,
        strategy: SharedStrategy,
    ) -> Result<TradeOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }

        let cancelled = Arc::clone(&self.cancelled);
        let subscription = self.bus.on_stop_requested(move |request| {
            if request.applies_to(bot_id) && !cancelled.swap(true, Ordering::SeqCst) {
                info!(bot_id = %bot_id, reason = %request.reason, "Stop requested, cancelling");
            }
        });
        let _guard = RunGuard {
            running: &self.running,
            bus: &self.bus,
            subscription,
        };

        let mut state = RunState {
            bot_id,
            opportunity,
            strategy: strategy.as_ref(),
            tick: 0,
            interval: Duration::from_millis(self.config.buy_poll_interval_ms),
            position: None,
            buy: None,
            exit_deadline: None,
            history: Vec::new(),
            started: Instant::now(),
        };

        info!(bot_id = %bot_id, "Monitoring opportunity");

        loop {
            state.tick += 1;

            if self.is_cancelled() && state.position.is_none() {
                state.record(None, MonitorAction::Cancelled);
                info!(bot_id = %bot_id, tick = state.tick, "Run cancelled without a position");
                return Ok(self.finish_exit(state, ExitReason::Stopped).await);
            }

            let snapshot = match self.deps.market_data.get_snapshot(opportunity).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(bot_id = %bot_id, tick = state.tick, error = %e, "Snapshot fetch failed, skipping tick");
                    state.record(None, MonitorAction::SnapshotFailed(e.to_string()));
                    if state.grace_elapsed() {
                        info!(bot_id = %bot_id, tick = state.tick, "Exit grace window elapsed");
                        return Ok(self.finish_exit(state, ExitReason::StrategyExit).await);
                    }
                    sleep(state.interval).await;
                    continue;
                }
            };

            if state.position.is_some() {
                if let Some(outcome) = self.position_tick(&mut state, &snapshot).await {
                    return Ok(outcome);
                }
            } else {
                self.entry_tick(&mut state, &snapshot).await?;

                if state.grace_elapsed() {
                    info!(bot_id = %bot_id, tick = state.tick, "Exit grace window elapsed");
                    return Ok(self.finish_exit(state, ExitReason::StrategyExit).await);
                }
            }

            sleep(state.interval).await;
        }
    }

    /// One tick without a position: exit, buy, or keep watching
    async fn entry_tick(&self, state: &mut RunState<'_>, snapshot: &MarketSnapshot) -> Result<()> {
        if state.exit_deadline.is_some() {
            state.record(Some(snapshot), MonitorAction::Observed);
            return Ok(());
        }

        if state.strategy.should_exit(None, snapshot) {
            let wait = Duration::from_millis(self.config.max_wait_after_decision_ms);
            info!(
                bot_id = %state.bot_id,
                tick = state.tick,
                grace_ms = self.config.max_wait_after_decision_ms,
                "Strategy signalled exit before buying"
            );
            state.exit_deadline = Some(Instant::now() + wait);
            state.record(Some(snapshot), MonitorAction::ExitSignal);
            return Ok(());
        }

        if !state.strategy.should_buy(snapshot) {
            state.record(Some(snapshot), MonitorAction::Observed);
            return Ok(());
        }

        state.record(Some(snapshot), MonitorAction::BuySignal);
        self.buy(state, snapshot).await
    }

    async fn buy(&self, state: &mut RunState<'_>, snapshot: &MarketSnapshot) -> Result<()> {
        let params = BuyParams {
            bot_id: state.bot_id,
            mint: state.opportunity.mint.clone(),
            bonding_curve: state.opportunity.bonding_curve.clone(),
            amount: self.config.buy_amount,
            slippage_bps: self.config.slippage_bps,
            metadata: state.strategy.metadata(),
        };

        info!(
            bot_id = %state.bot_id,
            amount = %params.amount,
            price = %snapshot.price,
            "Attempting buy"
        );

        let transaction = match self.deps.execution.buy(params).await {
            Ok(transaction) => transaction,
            Err(e) => {
                state.record(Some(snapshot), MonitorAction::BuyFailed(e.to_string()));
                return match self.deps.classifier.classify(&e) {
                    ErrorClass::Fatal(kind) => {
                        error!(bot_id = %state.bot_id, kind = %kind, error = %e, "Fatal buy error");
                        self.salvage(state).await;
                        Err(Error::BuyFatal { kind, source: e })
                    }
                    ErrorClass::Transient => {
                        warn!(bot_id = %state.bot_id, error = %e, "Buy failed, will re-evaluate next tick");
                        Ok(())
                    }
                };
            }
        };

        let thresholds = state.strategy.exit_thresholds(snapshot);
        let position = Position {
            trade_id: transaction.id,
            bot_id: state.bot_id,
            mint: transaction.mint.clone(),
            entry_price: transaction.price,
            token_amount: transaction.token_amount,
            cost: transaction.net_amount,
            stop_loss_percent: thresholds.stop_loss_percent,
            take_profit_percent: thresholds.take_profit_percent,
            trailing_stop_percent: thresholds.trailing_stop_percent,
            peak_price: transaction.price,
            status: PositionStatus::Open,
            opened_at: transaction.executed_at,
            closed_at: None,
        };

        if let Err(e) = self.deps.positions.insert(&position).await {
            warn!(bot_id = %state.bot_id, error = %e, "Failed to persist opened position");
        }

        info!(
            bot_id = %state.bot_id,
            signature = %transaction.signature,
            tokens = %transaction.token_amount,
            net = %transaction.net_amount,
            "Buy succeeded"
        );

        self.bus.trade_executed(state.bot_id, &transaction);
        state.position = Some(position);
        state.buy = Some(transaction);
        state.interval = Duration::from_millis(self.config.sell_poll_interval_ms);
        state.record(Some(snapshot), MonitorAction::Bought);
        Ok(())
    }

    /// Best-effort sell of whatever the failed buy may have transferred
    async fn salvage(&self, state: &RunState<'_>) {
        let params = SellParams {
            bot_id: state.bot_id,
            mint: state.opportunity.mint.clone(),
            bonding_curve: state.opportunity.bonding_curve.clone(),
            token_amount: None,
            slippage_bps: self.config.slippage_bps,
            reason: "salvage".to_string(),
            metadata: state.strategy.metadata(),
        };
        let limit = Duration::from_millis(self.config.salvage_timeout_ms);

        match timeout(limit, self.deps.execution.sell(params)).await {
            Ok(Ok(transaction)) => info!(
                bot_id = %state.bot_id,
                signature = %transaction.signature,
                "Salvage sell succeeded"
            ),
            Ok(Err(e)) => debug!(bot_id = %state.bot_id, error = %e, "Salvage sell failed"),
            Err(_) => debug!(bot_id = %state.bot_id, "Salvage sell timed out"),
        }
    }

    /// One tick with an open position; returns the outcome once sold
    async fn position_tick(
        &self,
        state: &mut RunState<'_>,
        snapshot: &MarketSnapshot,
    ) -> Option<TradeOutcome> {
        let mut position = state.position.take()?;
        position.observe(snapshot.price);

        let decision = state.strategy.should_sell(&position, snapshot);
        let reason = if decision.sell {
            decision.reason_or("strategy").to_string()
        } else if self.is_cancelled() {
            STOPPED_SELL_REASON.to_string()
        } else {
            if state.strategy.should_exit(Some(&position), snapshot) {
                debug!(bot_id = %state.bot_id, "Ignoring exit signal while holding a position");
                state.record(Some(snapshot), MonitorAction::ExitIgnored);
            } else {
                state.record(Some(snapshot), MonitorAction::Observed);
            }
            state.position = Some(position);
            return None;
        };

        state.record(Some(snapshot), MonitorAction::SellSignal(reason.clone()));
        match self.sell(state, &mut position, snapshot, &reason).await {
            Some(sell) => {
                state.record(Some(snapshot), MonitorAction::Sold);
                Some(self.finish_completed(state, sell, reason).await)
            }
            None => {
                state.position = Some(position);
                None
            }
        }
    }

    async fn sell(
        &self,
        state: &mut RunState<'_>,
        position: &mut Position,
        snapshot: &MarketSnapshot,
        reason: &str,
    ) -> Option<TradeTransaction> {
        let params = SellParams {
            bot_id: state.bot_id,
            mint: position.mint.clone(),
            bonding_curve: state.opportunity.bonding_curve.clone(),
            token_amount: Some(position.token_amount),
            slippage_bps: self.config.slippage_bps,
            reason: reason.to_string(),
            metadata: state.strategy.metadata(),
        };

        info!(
            bot_id = %state.bot_id,
            reason,
            price = %snapshot.price,
            change_pct = %position.change_percent(snapshot.price).round_dp(2),
            "Attempting sell"
        );

        let transaction = match self.deps.execution.sell(params).await {
            Ok(transaction) => transaction,
            Err(e) => {
                let class = self.deps.classifier.classify(&e);
                warn!(
                    bot_id = %state.bot_id,
                    error = %e,
                    class = ?class,
                    "Sell failed, retrying next tick"
                );
                state.record(Some(snapshot), MonitorAction::SellFailed(e.to_string()));
                return None;
            }
        };

        let realized_pnl = transaction.net_amount - position.cost;
        let closure = PositionClosure {
            exit_price: transaction.price,
            realized_pnl,
            reason: reason.to_string(),
            signature: transaction.signature.clone(),
            closed_at: transaction.executed_at,
        };
        position.status = PositionStatus::Closed;
        position.closed_at = Some(transaction.executed_at);

        if let Err(e) = self.deps.positions.close(position.trade_id, &closure).await {
            warn!(bot_id = %state.bot_id, error = %e, "Failed to persist position close");
        }

        info!(
            bot_id = %state.bot_id,
            signature = %transaction.signature,
            net = %transaction.net_amount,
            pnl = %realized_pnl,
            "Sell succeeded"
        );

        self.bus.trade_executed(state.bot_id, &transaction);
        Some(transaction)
    }

    async fn finish_completed(
        &self,
        state: &mut RunState<'_>,
        sell: TradeTransaction,
        reason: String,
    ) -> TradeOutcome {
        let history = std::mem::take(&mut state.history);
        let outcome = match state.buy.take() {
            Some(buy) => TradeOutcome::completed(state.bot_id, buy, sell, reason, history),
            // Unreachable: a position only exists after a recorded buy
            None => TradeOutcome::exited(
                state.bot_id,
                state.opportunity.mint.clone(),
                ExitReason::Stopped,
                history,
            ),
        };

        info!(
            bot_id = %state.bot_id,
            pnl = %outcome.realized_pnl(),
            ticks = state.tick,
            "Trade cycle completed"
        );

        self.bus.trade_cycle_completed(state.bot_id, &outcome);
        self.persist(state, &outcome).await;
        outcome
    }

    async fn finish_exit(&self, mut state: RunState<'_>, reason: ExitReason) -> TradeOutcome {
        let history = std::mem::take(&mut state.history);
        let outcome = TradeOutcome::exited(
            state.bot_id,
            state.opportunity.mint.clone(),
            reason,
            history,
        );
        info!(bot_id = %state.bot_id, reason = %reason, ticks = state.tick, "Run ended without a trade");
        self.persist(&state, &outcome).await;
        outcome
    }

    async fn persist(&self, state: &RunState<'_>, outcome: &TradeOutcome) {
        let report = OutcomeReport {
            bot_id: state.bot_id,
            mint: state.opportunity.mint.clone(),
            ticks: state.tick,
            duration_ms: u64::try_from(state.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            realized_pnl: outcome.realized_pnl(),
        };
        if let Err(e) = self.deps.results.insert_outcome(outcome, &report).await {
            warn!(bot_id = %state.bot_id, error = %e, "Failed to persist trade outcome");
        }
    }
}

impl std::fmt::Debug for TradingStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingStateMachine")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
