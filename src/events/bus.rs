//! In-process event bus between state machines and the lifecycle manager

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::types::StopRequest;
use crate::common::types::{BotId, TradeOutcome, TradeTransaction};

pub type TradeExecutedHandler = Arc<dyn Fn(BotId, &TradeTransaction) + Send + Sync>;
pub type TradeCycleCompletedHandler = Arc<dyn Fn(BotId, &TradeOutcome) + Send + Sync>;
pub type StopRequestedHandler = Arc<dyn Fn(&StopRequest) + Send + Sync>;

/// Handle returned by every `on_*` registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered handler list for one event kind
struct Handlers<H> {
    entries: Mutex<Vec<(SubscriptionId, H)>>,
}

impl<H: Clone> Handlers<H> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, id: SubscriptionId, handler: H) {
        self.entries.lock().push((id, handler));
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Clone the handlers out so dispatch runs without the lock held;
    /// handlers may publish or subscribe themselves.
    fn snapshot(&self) -> Vec<H> {
        self.entries.lock().iter().map(|(_, h)| h.clone()).collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Multi-subscriber notification channel for trade events
///
/// Dispatch is synchronous: every handler registered for a kind runs, in
/// registration order, before the publishing call returns. Subscribers that
/// keep shared counters rely on this so the counters reflect an event before
/// the publisher takes its next step.
pub struct EventBus {
    next_id: AtomicU64,
    trade_executed: Handlers<TradeExecutedHandler>,
    trade_cycle_completed: Handlers<TradeCycleCompletedHandler>,
    stop_requested: Handlers<StopRequestedHandler>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            trade_executed: Handlers::new(),
            trade_cycle_completed: Handlers::new(),
            stop_requested: Handlers::new(),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Publish an executed buy or sell
    pub fn trade_executed(&self, bot_id: BotId, transaction: &TradeTransaction) {
        debug!(bot_id = %bot_id, side = %transaction.side, "Publishing trade executed");
        for handler in self.trade_executed.snapshot() {
            handler(bot_id, transaction);
        }
    }

    /// Publish a finished round trip
    pub fn trade_cycle_completed(&self, bot_id: BotId, outcome: &TradeOutcome) {
        debug!(bot_id = %bot_id, "Publishing trade cycle completed");
        for handler in self.trade_cycle_completed.snapshot() {
            handler(bot_id, outcome);
        }
    }

    /// Publish a stop request
    pub fn stop_requested(&self, request: &StopRequest) {
        debug!(reason = %request.reason, scoped = request.is_scoped(), "Publishing stop requested");
        for handler in self.stop_requested.snapshot() {
            handler(request);
        }
    }

    pub fn on_trade_executed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(BotId, &TradeTransaction) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.trade_executed.push(id, Arc::new(handler));
        id
    }

    pub fn on_trade_cycle_completed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(BotId, &TradeOutcome) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.trade_cycle_completed.push(id, Arc::new(handler));
        id
    }

    pub fn on_stop_requested<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StopRequest) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.stop_requested.push(id, Arc::new(handler));
        id
    }

    /// Remove a handler of any kind; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.trade_executed.remove(id)
            || self.trade_cycle_completed.remove(id)
            || self.stop_requested.remove(id)
    }

    /// Total number of registered handlers across all kinds
    pub fn subscriber_count(&self) -> usize {
        self.trade_executed.len() + self.trade_cycle_completed.len() + self.stop_requested.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("trade_executed", &self.trade_executed.len())
            .field("trade_cycle_completed", &self.trade_cycle_completed.len())
            .field("stop_requested", &self.stop_requested.len())
            .finish()
    }
}
