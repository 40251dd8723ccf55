//! Error taxonomy for the consensus core.
//!
//! Duplicate submissions (same oracle, same vote) are NOT errors: they are
//! surfaced as benign no-op outcomes so callers can retry freely. The
//! variants here cover genuine rejections plus the two infrastructure
//! conditions (`Conflict`, `Ledger`) and the fatal `Internal` invariant
//! violation.

use crate::ledger::LedgerError;
use thiserror::Error;

/// Errors returned by the registry and consensus engines.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SuretyError {
    /// Caller lacks the role required for the operation.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Caller is a registered airline but has not met the funding threshold.
    #[error("airline has not met the funding threshold: {0}")]
    NotFunded(String),

    /// Participant is already registered; registration is not repeatable.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    /// Payment below the required threshold (oracle fee or airline funding).
    #[error("insufficient funds: provided {provided}, required {required}")]
    InsufficientFunds { provided: u64, required: u64 },

    /// Unknown flight, oracle, or airline key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Response submitted against an index the request or oracle does not hold.
    #[error("index mismatch: {0}")]
    IndexMismatch(String),

    /// Operation is not valid in the entity's current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A ledger compare-and-swap kept losing races and gave up.
    #[error("version conflict on {key} after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },

    /// Failure reported by the ledger collaborator.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A core invariant was violated; the affected operation is aborted.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl SuretyError {
    /// Returns `true` if the operation may be retried as-is.
    ///
    /// Only contention and transient ledger failures qualify; every other
    /// variant reflects a decision that will not change on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Ledger(_))
    }

    /// Returns `true` for invariant violations that must abort the operation.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
