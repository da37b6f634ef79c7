//! Process-wide risk limits enforced from trade events

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::admission::AdmissionListener;
use crate::common::types::{BotId, Side, TradeOutcome, TradeTransaction};
use crate::config::types::LimitsConfig;
use crate::events::{EventBus, StopReason, StopRequest, SubscriptionId};

/// Counters owned by the lifecycle manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LifecycleCounters {
    pub open_positions: u32,
    pub completed_trades: u32,
    pub balance: Decimal,
}

#[derive(Debug, Default)]
struct ManagerState {
    counters: LifecycleCounters,
    /// Intake is paused because of the open-position ceiling
    paused_for_positions: bool,
    /// An unscoped stop went out; intake never resumes after this
    stopped: bool,
    balance_stop_sent: bool,
    full_trades_stop_sent: bool,
}

struct Inner {
    limits: LimitsConfig,
    bus: Arc<EventBus>,
    listener: AdmissionListener,
    state: Mutex<ManagerState>,
}

/// Enforces open-position, full-trade and balance limits
///
/// Counters are mutated only from this manager's own bus handlers. Bus
/// dispatch is synchronous, so a count reflects a trade before the state
/// machine that published it takes its next step.
///
/// Scoped stops pause intake; unscoped stops pause intake for good and reach
/// every running state machine through its own bus subscription.
pub struct LifecycleManager {
    inner: Arc<Inner>,
    subscriptions: Vec<SubscriptionId>,
}

impl LifecycleManager {
    pub fn new(
        limits: LimitsConfig,
        bus: Arc<EventBus>,
        listener: AdmissionListener,
        initial_balance: Decimal,
    ) -> Self {
        let inner = Arc::new(Inner {
            limits,
            bus: Arc::clone(&bus),
            listener,
            state: Mutex::new(ManagerState {
                counters: LifecycleCounters {
                    balance: initial_balance,
                    ..LifecycleCounters::default()
                },
                ..ManagerState::default()
            }),
        });

        // Handlers hold weak references; the bus must not keep the manager alive
        let weak = Arc::downgrade(&inner);
        let weak_trade = Weak::clone(&weak);
        let trade_executed = bus.on_trade_executed(move |bot_id, tx| {
            if let Some(inner) = weak_trade.upgrade() {
                inner.on_trade_executed(bot_id, tx);
            }
        });
        let weak_cycle = Weak::clone(&weak);
        let trade_cycle = bus.on_trade_cycle_completed(move |bot_id, outcome| {
            if let Some(inner) = weak_cycle.upgrade() {
                inner.on_trade_cycle_completed(bot_id, outcome);
            }
        });
        let stop = bus.on_stop_requested(move |request| {
            if let Some(inner) = weak.upgrade() {
                inner.on_stop_requested(request);
            }
        });

        Self {
            inner,
            subscriptions: vec![trade_executed, trade_cycle, stop],
        }
    }

    /// Broadcast an unscoped stop right away, regardless of counters
    ///
    /// `exclude` lets the bot that triggered the stop unwind on its own.
    pub fn stop_all(&self, reason: StopReason, exclude: Option<BotId>) {
        let mut request = StopRequest::unscoped(reason);
        if let Some(bot_id) = exclude {
            request = request.excluding(bot_id);
        }
        warn!(reason = %request.reason, excluded = ?exclude, "Stopping all state machines");
        self.inner.bus.stop_requested(&request);
    }

    pub fn counters(&self) -> LifecycleCounters {
        self.inner.state.lock().counters
    }

    /// An unscoped stop has been issued
    pub fn is_stopped(&self) -> bool {
        self.inner.state.lock().stopped
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        for id in &self.subscriptions {
            self.inner.bus.unsubscribe(*id);
        }
    }
}

impl Inner {
    fn on_trade_executed(&self, bot_id: BotId, tx: &TradeTransaction) {
        let (pause, resume, balance_stop, counters) = {
            let mut state = self.state.lock();
            state.counters.balance += tx.balance_delta();
            match tx.side {
                Side::Buy => state.counters.open_positions += 1,
                Side::Sell => {
                    state.counters.open_positions = state.counters.open_positions.saturating_sub(1)
                }
            }

            let open = state.counters.open_positions;
            let at_ceiling = self
                .limits
                .max_open_positions
                .is_some_and(|max| open >= max);

            let pause = tx.side == Side::Buy && at_ceiling && !state.paused_for_positions;
            if pause {
                state.paused_for_positions = true;
            }

            let resume = state.paused_for_positions && !at_ceiling && !state.stopped;
            if resume {
                state.paused_for_positions = false;
            }

            let balance_stop = !state.balance_stop_sent
                && self
                    .limits
                    .min_wallet_balance
                    .is_some_and(|floor| state.counters.balance <= floor);
            if balance_stop {
                state.balance_stop_sent = true;
            }

            (pause, resume, balance_stop, state.counters)
        };

        info!(
            bot_id = %bot_id,
            side = %tx.side,
            open_positions = counters.open_positions,
            balance = %counters.balance,
            "Trade executed"
        );

        if pause {
            info!(
                open_positions = counters.open_positions,
                max = ?self.limits.max_open_positions,
                "Max open positions reached"
            );
            self.bus
                .stop_requested(&StopRequest::scoped(StopReason::MaxOpenPositions));
        }

        if resume {
            info!(open_positions = counters.open_positions, "Open positions below ceiling, resuming intake");
            if let Err(e) = self.listener.start(true) {
                warn!(error = %e, "Failed to resume intake");
            }
        }

        if balance_stop {
            warn!(
                balance = %counters.balance,
                floor = ?self.limits.min_wallet_balance,
                "Wallet balance at or below floor"
            );
            self.bus
                .stop_requested(&StopRequest::unscoped(StopReason::MinWalletBalance));
        }
    }

    fn on_trade_cycle_completed(&self, bot_id: BotId, outcome: &TradeOutcome) {
        let (completed, stop) = {
            let mut state = self.state.lock();
            state.counters.completed_trades += 1;
            let completed = state.counters.completed_trades;
            let stop = !state.full_trades_stop_sent
                && self
                    .limits
                    .max_full_trades
                    .is_some_and(|max| completed >= max);
            if stop {
                state.full_trades_stop_sent = true;
            }
            (completed, stop)
        };

        info!(
            bot_id = %bot_id,
            pnl = %outcome.realized_pnl(),
            completed_trades = completed,
            "Trade cycle completed"
        );

        if stop {
            info!(completed_trades = completed, "Max full trades reached");
            self.bus
                .stop_requested(&StopRequest::unscoped(StopReason::MaxFullTrades));
        }
    }

    fn on_stop_requested(&self, request: &StopRequest) {
        if !request.is_scoped() {
            let mut state = self.state.lock();
            state.stopped = true;
            state.paused_for_positions = false;
        }
        info!(reason = %request.reason, scoped = request.is_scoped(), "Pausing intake");
        self.listener.stop(true);
    }
}
