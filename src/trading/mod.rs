//! Per-opportunity trading: state machine and error classification

mod classify;
mod state_machine;

pub use classify::{DefaultClassifier, ErrorClass, ErrorClassifier};
pub use state_machine::{TradingDeps, TradingStateMachine};
