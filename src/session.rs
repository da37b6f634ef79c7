//! Wiring for one trading process
//!
//! ```text
//!   OpportunityFeed ──► AdmissionListener ──► TradingStateMachine (one per opportunity)
//!                              ▲                        │
//!                              │ pause / resume         │ trade events
//!                              │                        ▼
//!                       LifecycleManager ◄────────── EventBus ──► stop requests
//! ```

use std::sync::{Arc, OnceLock, Weak};

use tokio::runtime::Handle;
use tracing::{error, info, instrument, warn};

use crate::admission::AdmissionListener;
use crate::common::errors::{FatalKind, Result};
use crate::common::traits::{OpportunityFeed, Wallet};
use crate::common::types::{BotId, Opportunity, TradeOutcome};
use crate::config::types::AppConfig;
use crate::events::{EventBus, StopReason, SubscriptionId};
use crate::lifecycle::{LifecycleCounters, LifecycleManager};
use crate::strategy::StrategyFactory;
use crate::trading::{TradingDeps, TradingStateMachine};

/// A running sniper: intake, per-opportunity trading and risk limits
pub struct TradingSession {
    bus: Arc<EventBus>,
    listener: AdmissionListener,
    lifecycle: Arc<LifecycleManager>,
    wallet_subscription: Option<SubscriptionId>,
}

impl TradingSession {
    /// Build a session; the lifecycle balance starts from the wallet's balance
    ///
    /// In simulated mode every executed trade is also applied to the wallet.
    pub async fn new(
        config: AppConfig,
        feed: Arc<dyn OpportunityFeed>,
        deps: TradingDeps,
        strategies: StrategyFactory,
        wallet: Arc<dyn Wallet>,
    ) -> Result<Self> {
        config.validate()?;
        let bus = Arc::new(EventBus::new());
        let initial_balance = wallet.get_balance().await?;

        // Filled once the manager exists; processing only starts after that
        let lifecycle_slot: Arc<OnceLock<Weak<LifecycleManager>>> = Arc::new(OnceLock::new());

        let process = {
            let bus = Arc::clone(&bus);
            let trading = config.trading.clone();
            let slot = Arc::clone(&lifecycle_slot);
            move |opportunity: Opportunity, index: u64| {
                let bus = Arc::clone(&bus);
                let trading = trading.clone();
                let deps = deps.clone();
                let strategy = strategies();
                let slot = Arc::clone(&slot);
                async move {
                    let bot_id = BotId::new();
                    info!(bot_id = %bot_id, task_index = index, mint = %opportunity.mint, "Starting state machine");
                    let machine = TradingStateMachine::new(trading, bus, deps)?;

                    match machine.run(bot_id, &opportunity, strategy).await {
                        Ok(outcome) => {
                            log_outcome(&outcome);
                            Ok::<(), anyhow::Error>(())
                        }
                        Err(e) => {
                            if e.fatal_kind() == Some(FatalKind::InsufficientFunds) {
                                match slot.get().and_then(Weak::upgrade) {
                                    Some(lifecycle) => {
                                        lifecycle.stop_all(StopReason::InsufficientFunds, Some(bot_id))
                                    }
                                    None => warn!(bot_id = %bot_id, "Lifecycle manager gone, cannot stop others"),
                                }
                            }
                            Err(e.into())
                        }
                    }
                }
            }
        };

        let listener = AdmissionListener::new(feed, config.admission.max_concurrent, process);
        let lifecycle = Arc::new(LifecycleManager::new(
            config.limits.clone(),
            Arc::clone(&bus),
            listener.clone(),
            initial_balance,
        ));
        let filled = lifecycle_slot.set(Arc::downgrade(&lifecycle));
        debug_assert!(filled.is_ok(), "lifecycle slot is filled exactly once");

        let wallet_subscription = config.trading.simulate.then(|| {
            let handle = Handle::current();
            bus.on_trade_executed(move |_bot_id, tx| {
                let wallet = Arc::clone(&wallet);
                let delta = tx.balance_delta();
                handle.spawn(async move {
                    if let Err(e) = wallet.apply_delta(delta).await {
                        error!(error = %e, "Failed to update simulated wallet");
                    }
                });
            })
        });

        info!(
            balance = %initial_balance,
            max_concurrent = ?config.admission.max_concurrent,
            max_open_positions = ?config.limits.max_open_positions,
            max_full_trades = ?config.limits.max_full_trades,
            min_wallet_balance = ?config.limits.min_wallet_balance,
            simulate = config.trading.simulate,
            "Trading session ready"
        );

        Ok(Self {
            bus,
            listener,
            lifecycle,
            wallet_subscription,
        })
    }

    /// Begin consuming opportunities
    pub fn start(&self) -> Result<()> {
        self.listener.start(false)
    }

    /// Resolves once intake has stopped and every admitted opportunity settled
    pub async fn wait_until_done(&self) {
        self.listener.wait_until_done().await
    }

    /// Stop everything and wait for in-flight state machines to settle
    ///
    /// Machines holding a position sell it before they finish.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.lifecycle.stop_all(StopReason::Shutdown, None);
        self.listener.wait_until_idle().await;
        info!(counters = ?self.lifecycle.counters(), "Trading session shut down");
    }

    pub fn counters(&self) -> LifecycleCounters {
        self.lifecycle.counters()
    }

    pub fn is_stopped(&self) -> bool {
        self.lifecycle.is_stopped()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn listener(&self) -> &AdmissionListener {
        &self.listener
    }
}

impl Drop for TradingSession {
    fn drop(&mut self) {
        if let Some(id) = self.wallet_subscription.take() {
            self.bus.unsubscribe(id);
        }
    }
}

fn log_outcome(outcome: &TradeOutcome) {
    match outcome {
        TradeOutcome::Completed(trade) => info!(
            bot_id = %trade.bot_id,
            mint = %trade.mint,
            pnl = %trade.realized_pnl,
            reason = %trade.sell_reason,
            "Round trip completed"
        ),
        TradeOutcome::Exited(run) => info!(
            bot_id = %run.bot_id,
            mint = %run.mint,
            reason = ?run.reason,
            "Exited without a position"
        ),
    }
}
