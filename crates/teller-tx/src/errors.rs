//! Error types for the transaction executor.
//!
//! [`TxError`] covers every failure the executor itself can raise. Errors
//! produced by a unit of work travel through the executor in the caller's
//! own error type, which must implement `From<TxError>`.

use thiserror::Error;

/// Boxed error used to carry driver and unit-of-work failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the transaction executor and execution context.
#[derive(Debug, Error)]
pub enum TxError {
    /// The connection source could not supply a connection, or the
    /// connection could not be switched into a manual transaction.
    #[error("failed to acquire connection: {0}")]
    ConnectionAcquisition(#[source] BoxError),

    /// A connection lookup happened outside any unit of work.
    #[error("no transaction bound to the current execution context")]
    NoActiveTransaction,

    /// A unit of work was started inside another one under the strict policy.
    #[error("unable to nest transactions")]
    NestedTransaction,

    /// `bind` was called while a connection was already bound.
    #[error("a connection is already bound to the current execution context")]
    AlreadyBound,

    /// Commit failed. The transaction outcome is unknown.
    #[error("commit failed: {0}")]
    Commit(#[source] BoxError),

    /// Rollback failed after the unit of work failed.
    ///
    /// `suppressed` is the unit-of-work failure that triggered the rollback.
    #[error("rollback failed: {source} (suppressed: {suppressed})")]
    Rollback {
        /// Why the rollback failed.
        #[source]
        source: BoxError,
        /// The original unit-of-work failure.
        suppressed: BoxError,
    },
}

impl TxError {
    /// Wrap a connection-source failure.
    pub fn acquisition(err: impl Into<BoxError>) -> Self {
        Self::ConnectionAcquisition(err.into())
    }

    /// The suppressed unit-of-work failure, if this is a rollback failure.
    pub fn suppressed(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Rollback { suppressed, .. } => Some(suppressed.as_ref()),
            _ => None,
        }
    }
}

/// Convenience type alias for executor results.
pub type Result<T> = std::result::Result<T, TxError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
