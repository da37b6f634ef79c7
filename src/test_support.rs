//! Fakes shared by unit tests
//!
//! Integration tests under `tests/` build against the public API only and
//! keep their own fakes in `tests/common/mod.rs`; nothing here is visible
//! to them.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::subscriber::DefaultGuard;

use crate::common::errors::Result;
use crate::common::traits::{OpportunityFeed, OpportunityHandler};
use crate::common::types::Opportunity;

type ListenHook = Box<dyn FnOnce() + Send>;

/// Feed that delivers only when the test pushes opportunities
#[derive(Default)]
pub struct ManualFeed {
    handler: Mutex<Option<OpportunityHandler>>,
    before_listen: Mutex<Option<ListenHook>>,
    pub listen_calls: AtomicUsize,
}

impl ManualFeed {
    pub fn deliver(&self, opportunity: Opportunity) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(opportunity);
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.handler.lock().is_some()
    }

    pub fn listen_count(&self) -> usize {
        self.listen_calls.load(Ordering::SeqCst)
    }

    /// Run `hook` inside the next `listen`, before the handler is stored
    pub fn before_listen(&self, hook: impl FnOnce() + Send + 'static) {
        *self.before_listen.lock() = Some(Box::new(hook));
    }
}

impl OpportunityFeed for ManualFeed {
    fn listen(&self, handler: OpportunityHandler) -> Result<()> {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        let hook = self.before_listen.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        *self.handler.lock() = Some(handler);
        Ok(())
    }

    fn stop_listening(&self) {
        *self.handler.lock() = None;
    }
}

pub fn opportunity(n: usize) -> Opportunity {
    Opportunity {
        mint: format!("mint{n}"),
        creator: "creator".to_string(),
        bonding_curve: format!("curve{n}"),
        associated_bonding_curve: None,
        name: format!("Token {n}"),
        symbol: format!("TK{n}"),
        created_at: Utc::now(),
    }
}

/// Formatted tracing output collected in memory
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture tracing output on the current thread until the guard drops
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}
