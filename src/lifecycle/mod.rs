//! Lifecycle oversight across all running state machines

mod manager;

pub use manager::{LifecycleCounters, LifecycleManager};
