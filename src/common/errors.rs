//! Error types for the trading core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the crate-wide Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for trading-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// `run` was called on a state machine whose previous run has not settled
    #[error("State machine is already running")]
    AlreadyRunning,

    /// Buy failed in a way that must not be retried
    #[error("Fatal buy error ({kind}): {source}")]
    BuyFatal {
        kind: FatalKind,
        #[source]
        source: ExecutionError,
    },

    /// Market data provider failure
    #[error("Market data error: {0}")]
    MarketData(String),

    /// Opportunity feed failure
    #[error("Feed error: {0}")]
    Feed(String),

    /// Position or result store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Fatal kind when this is a buy-fatal error
    pub fn fatal_kind(&self) -> Option<FatalKind> {
        match self {
            Error::BuyFatal { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

/// Errors surfaced by the exchange execution client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Wallet cannot cover the trade plus fees
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Transaction was malformed or rejected by the program
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Recoverable on-chain conflict (stale blockhash, slippage race, ...)
    #[error("on-chain conflict: {0}")]
    Conflict(String),

    /// RPC transport failure
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Confirmation did not arrive in time
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

/// Fatal buy error buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalKind {
    InsufficientFunds,
    MalformedTransaction,
}

impl std::fmt::Display for FatalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalKind::InsufficientFunds => write!(f, "insufficient_funds"),
            FatalKind::MalformedTransaction => write!(f, "malformed_transaction"),
        }
    }
}
