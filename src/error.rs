//! Resolution errors.

use std::time::Duration;

use serde::Serialize;

use crate::store::StoreError;
use crate::types::{ApplicationResult, FailedUnit, FailureContext};

/// Why a resolution stopped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    /// The unit resolved to no transaction data (or is not defined at all).
    #[error("No transactions provided for change unit {name}")]
    MissingPayload {
        /// Change unit name.
        name: String,
    },
    /// The unit names a generator nobody registered.
    #[error("Generator not registered: {generator}")]
    UnregisteredGenerator {
        /// Registry key.
        generator: String,
    },
    /// The generator raised an error.
    #[error("Generator {generator} failed: {reason}")]
    GeneratorFailure {
        /// Registry key.
        generator: String,
        /// Generator's message.
        reason: String,
    },
    /// Schema sync did not finish in time.
    #[error("Timed out after {timeout:?} waiting for schema sync")]
    SyncTimeout {
        /// Configured bound.
        timeout: Duration,
    },
    /// The guarded transaction was rejected.
    #[error("Transaction rejected: {0}")]
    StoreSubmission(#[source] StoreError),
    /// Reading from or bootstrapping the store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// `requires` edges form a cycle.
    #[error("Dependency cycle: {}", path.join(" -> "))]
    DependencyCycle {
        /// Units on the cycle, starting and ending with the same name.
        path: Vec<String>,
    },
}

/// Error returned to callers of a resolution.
///
/// Carries everything applied before the failure. Those units stay committed;
/// retrying the same call skips them.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("{reason}")]
pub struct ConformityError {
    reason: String,
    context: FailureContext,
    #[serde(skip)]
    #[source]
    cause: ResolutionError,
}

impl ConformityError {
    /// Failure while handling a specific unit.
    pub fn for_unit(name: impl Into<String>, cause: ResolutionError, succeeded: ApplicationResult) -> Self {
        let reason = cause.to_string();
        Self {
            context: FailureContext {
                succeeded,
                failed: Some(FailedUnit {
                    name: name.into(),
                    reason: reason.clone(),
                }),
            },
            reason,
            cause,
        }
    }

    /// Failure before any unit was attempted.
    pub fn bootstrap(cause: impl Into<ResolutionError>) -> Self {
        let cause = cause.into();
        Self {
            reason: cause.to_string(),
            context: FailureContext::default(),
            cause,
        }
    }

    /// Human-readable reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Units applied before the failure.
    pub fn succeeded(&self) -> &ApplicationResult {
        &self.context.succeeded
    }

    /// The failing unit, if the failure was tied to one.
    pub fn failed(&self) -> Option<&FailedUnit> {
        self.context.failed.as_ref()
    }

    /// Full failure context.
    pub fn context(&self) -> &FailureContext {
        &self.context
    }

    /// Underlying cause.
    pub fn cause(&self) -> &ResolutionError {
        &self.cause
    }
}
