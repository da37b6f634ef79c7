//! Admission-controlled intake of opportunities

use std::future::Future;
use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::common::errors::Result;
use crate::common::traits::{OpportunityFeed, OpportunityHandler};
use crate::common::types::Opportunity;

/// Async processing function invoked once per admitted opportunity
///
/// Receives the opportunity and its task index. Errors are logged by the
/// listener; they never prevent the slot from being released.
pub type ProcessFn =
    Arc<dyn Fn(Opportunity, u64) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Debug, Default)]
struct IntakeState {
    /// Feed subscription is active
    listening: bool,
    /// Pause held by an explicit `stop(force = true)`
    forced: bool,
    in_progress: usize,
    next_task_index: u64,
}

struct Inner {
    feed: Arc<dyn OpportunityFeed>,
    process: ProcessFn,
    max_concurrent: Option<usize>,
    state: Mutex<IntakeState>,
    changed: Notify,
}

/// Wraps an opportunity feed and bounds how many opportunities run at once
///
/// At the ceiling the listener unsubscribes from the feed; opportunities
/// delivered meanwhile are dropped since the feed is a live stream. When a
/// processing task finishes and capacity frees, intake resumes on its own
/// unless the pause was forced from outside.
#[derive(Clone)]
pub struct AdmissionListener {
    inner: Arc<Inner>,
}

impl AdmissionListener {
    pub fn new<F, Fut>(
        feed: Arc<dyn OpportunityFeed>,
        max_concurrent: Option<usize>,
        process: F,
    ) -> Self
    where
        F: Fn(Opportunity, u64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let process: ProcessFn = Arc::new(move |opportunity, index| process(opportunity, index).boxed());
        Self {
            inner: Arc::new(Inner {
                feed,
                process,
                max_concurrent,
                state: Mutex::new(IntakeState::default()),
                changed: Notify::new(),
            }),
        }
    }

    /// Begin consuming the feed; a no-op while already consuming
    ///
    /// `resuming` only changes the log line. Clears any forced pause.
    pub fn start(&self, resuming: bool) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            state.forced = false;
            if state.listening {
                debug!("Admission listener already started");
                return Ok(());
            }
            state.listening = true;
        }

        if resuming {
            info!("Resuming opportunity intake");
        } else {
            info!(max_concurrent = ?self.inner.max_concurrent, "Starting opportunity intake");
        }

        self.inner.subscribe()
    }

    /// Stop consuming the feed
    ///
    /// With `force` the pause is held until the next explicit `start`;
    /// finishing tasks will not resume intake.
    pub fn stop(&self, force: bool) {
        let was_listening = {
            let mut state = self.inner.state.lock();
            if force {
                state.forced = true;
            }
            std::mem::replace(&mut state.listening, false)
        };

        if was_listening {
            info!(force, "Stopping opportunity intake");
            self.inner.feed.stop_listening();
        }
        self.inner.changed.notify_waiters();
    }

    /// Admitted opportunities whose processing has not finished
    pub fn in_progress_count(&self) -> usize {
        self.inner.state.lock().in_progress
    }

    pub fn is_listening(&self) -> bool {
        self.inner.state.lock().listening
    }

    /// Not consuming and nothing in flight
    pub fn is_done(&self) -> bool {
        let state = self.inner.state.lock();
        !state.listening && state.in_progress == 0
    }

    /// Wait until no admitted opportunity is in flight
    pub async fn wait_until_idle(&self) {
        self.wait_for(|state| state.in_progress == 0).await
    }

    /// Wait until `is_done` holds
    pub async fn wait_until_done(&self) {
        self.wait_for(|state| !state.listening && state.in_progress == 0)
            .await
    }

    async fn wait_for(&self, predicate: impl Fn(&IntakeState) -> bool) {
        loop {
            // Register before checking so a notification in between is not lost
            let notified = self.inner.changed.notified();
            if predicate(&*self.inner.state.lock()) {
                return;
            }
            notified.await;
        }
    }
}

impl Inner {
    fn handler(inner: &Arc<Inner>) -> OpportunityHandler {
        let weak: Weak<Inner> = Arc::downgrade(inner);
        Arc::new(move |opportunity| {
            if let Some(inner) = weak.upgrade() {
                inner.on_opportunity(opportunity);
            }
        })
    }

    fn on_opportunity(self: &Arc<Self>, opportunity: Opportunity) {
        let (index, at_capacity) = {
            let mut state = self.state.lock();
            if !state.listening {
                debug!(mint = %opportunity.mint, "Intake paused, dropping opportunity");
                return;
            }
            if let Some(max) = self.max_concurrent {
                if state.in_progress >= max {
                    drop(state);
                    info!(
                        max_concurrent = max,
                        mint = %opportunity.mint,
                        "Reached max concurrent opportunities, pausing intake"
                    );
                    self.pause();
                    return;
                }
            }
            state.in_progress += 1;
            let index = state.next_task_index;
            state.next_task_index += 1;
            let at_capacity = self
                .max_concurrent
                .is_some_and(|max| state.in_progress >= max);
            (index, at_capacity)
        };

        info!(task_index = index, mint = %opportunity.mint, "Admitted opportunity");

        let task = (self.process)(opportunity, index);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            // Run the task separately so a panic still releases the slot
            match tokio::spawn(task).await {
                Ok(Ok(())) => debug!(task_index = index, "Opportunity processing finished"),
                Ok(Err(e)) => error!(task_index = index, error = %e, "Opportunity processing failed"),
                Err(e) => error!(task_index = index, error = %e, "Opportunity processing panicked"),
            }
            inner.release();
        });

        if at_capacity {
            info!(
                max_concurrent = ?self.max_concurrent,
                "Reached max concurrent opportunities, pausing intake"
            );
            self.pause();
        }
    }

    /// Internal pause at the ceiling; does not set the forced flag
    fn pause(&self) {
        let was_listening = std::mem::replace(&mut self.state.lock().listening, false);
        if was_listening {
            self.feed.stop_listening();
        }
    }

    fn release(self: &Arc<Self>) {
        let resume = {
            let mut state = self.state.lock();
            state.in_progress = state.in_progress.saturating_sub(1);
            let has_capacity = self
                .max_concurrent
                .map_or(true, |max| state.in_progress < max);
            let resume = !state.listening && !state.forced && has_capacity;
            if resume {
                state.listening = true;
            }
            resume
        };

        if resume {
            info!("Capacity freed, resuming opportunity intake");
            if let Err(e) = self.subscribe() {
                warn!(error = %e, "Failed to resume opportunity intake");
            }
        }
        self.changed.notify_waiters();
    }

    /// Subscribe to the feed after `listening` was claimed under the lock
    fn subscribe(self: &Arc<Self>) -> Result<()> {
        if let Err(e) = self.feed.listen(Inner::handler(self)) {
            self.state.lock().listening = false;
            return Err(e);
        }
        // A stop may have landed between claiming and subscribing
        if !self.state.lock().listening {
            debug!("Intake stopped while subscribing, dropping feed subscription");
            self.feed.stop_listening();
        }
        Ok(())
    }
}

impl std::fmt::Debug for AdmissionListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("AdmissionListener")
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("state", &*state)
            .finish()
    }
}
