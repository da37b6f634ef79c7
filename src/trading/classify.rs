//! Fatal-vs-transient classification of execution errors

use crate::common::errors::{ExecutionError, FatalKind};

/// Bucket an execution error falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Capital state is uncertain; never retry
    Fatal(FatalKind),
    /// Safe to retry on the next tick
    Transient,
}

/// Maps execution-client errors onto the two buckets
///
/// The mapping is client-specific; swap the implementation to match the
/// errors a given execution client produces.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &ExecutionError) -> ErrorClass;
}

/// Classifier for the errors modelled by [`ExecutionError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, error: &ExecutionError) -> ErrorClass {
        match error {
            ExecutionError::InsufficientFunds => ErrorClass::Fatal(FatalKind::InsufficientFunds),
            ExecutionError::InvalidTransaction(_) => {
                ErrorClass::Fatal(FatalKind::MalformedTransaction)
            }
            ExecutionError::Conflict(_)
            | ExecutionError::Rpc(_)
            | ExecutionError::Timeout(_)
            | ExecutionError::Other(_) => ErrorClass::Transient,
        }
    }
}
