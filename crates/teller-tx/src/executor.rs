//! The transaction executor.
//!
//! [`TransactionExecutor::execute`] is the only way business code opens a
//! transaction:
//!
//! 1. If the context already has a connection, the [`NestingPolicy`] decides:
//!    join it (`Reuse`) or fail with [`TxError::NestedTransaction`] (`Strict`).
//! 2. Otherwise a connection is acquired, switched out of auto-commit and
//!    bound into the context.
//! 3. The unit of work runs. `Ok` commits; `Err` rolls back and re-surfaces
//!    the error unchanged. A failed rollback becomes [`TxError::Rollback`]
//!    carrying the original error as its suppressed cause. A failed commit
//!    is reported as [`TxError::Commit`] without attempting a rollback.
//! 4. On every exit path, including a panicking unit of work, the binding is
//!    cleared and then the connection is released.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::connection::{ConnectionSource, TxConnection};
use crate::context::ExecutionContext;
use crate::errors::{BoxError, TxError};

/// What `execute` does when the context already has a bound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingPolicy {
    /// Run the inner unit of work on the outer connection. Only the
    /// outermost `execute` commits or rolls back.
    #[default]
    Reuse,
    /// Reject the inner call with [`TxError::NestedTransaction`].
    Strict,
}

impl NestingPolicy {
    /// Lowercase name, as used in settings and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reuse => "reuse",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for NestingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NestingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reuse" => Ok(Self::Reuse),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown nesting policy '{other}' (expected 'reuse' or 'strict')"
            )),
        }
    }
}

/// Runs units of work inside database transactions.
#[derive(Clone)]
pub struct TransactionExecutor<S> {
    source: S,
    policy: NestingPolicy,
}

impl<S: ConnectionSource> TransactionExecutor<S> {
    /// Create an executor drawing connections from `source`.
    pub fn new(source: S, policy: NestingPolicy) -> Self {
        Self { source, policy }
    }

    /// The nesting policy in effect.
    pub fn policy(&self) -> NestingPolicy {
        self.policy
    }

    /// The underlying connection source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run `work` inside a transaction bound to `ctx` and return its value.
    ///
    /// The unit of work reaches the connection through
    /// [`ExecutionContext::connection`]. Its error type must absorb
    /// [`TxError`] so executor failures and business failures travel on
    /// the same channel.
    ///
    /// `T: 'static` keeps a borrow of the connection from escaping as the
    /// returned value: the binding must be free again before commit.
    pub fn execute<T, E, F>(&self, ctx: &ExecutionContext<S::Connection>, work: F) -> Result<T, E>
    where
        T: 'static,
        F: FnOnce(&ExecutionContext<S::Connection>) -> Result<T, E>,
        E: From<TxError> + std::error::Error + Send + Sync + 'static,
    {
        if ctx.is_bound() {
            return match self.policy {
                NestingPolicy::Reuse => {
                    trace!("joining transaction already bound to this context");
                    work(ctx)
                }
                NestingPolicy::Strict => Err(TxError::NestedTransaction.into()),
            };
        }

        let mut connection = self.source.acquire()?;
        connection.begin().map_err(TxError::acquisition)?;
        ctx.bind(connection)?;
        let mut scope = BindingScope::new(ctx);
        debug!(policy = %self.policy, "transaction started");

        match work(ctx) {
            Ok(value) => {
                scope.settle();
                ctx.with_connection_mut(|c| c.commit())?
                    .map_err(|e| TxError::Commit(Box::new(e)))?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(error) => {
                scope.settle();
                Err(rollback(ctx, error))
            }
        }
    }

    /// Like [`execute`](Self::execute) for units of work run only for their
    /// side effects.
    pub fn run<E, F>(&self, ctx: &ExecutionContext<S::Connection>, work: F) -> Result<(), E>
    where
        F: FnOnce(&ExecutionContext<S::Connection>) -> Result<(), E>,
        E: From<TxError> + std::error::Error + Send + Sync + 'static,
    {
        self.execute(ctx, work)
    }
}

impl<S> fmt::Debug for TransactionExecutor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Roll back after a failed unit of work and pick the error to surface.
fn rollback<C, E>(ctx: &ExecutionContext<C>, error: E) -> E
where
    C: TxConnection,
    E: From<TxError> + std::error::Error + Send + Sync + 'static,
{
    let failure: BoxError = match ctx.with_connection_mut(|c| c.rollback()) {
        Ok(Ok(())) => {
            debug!(cause = %error, "transaction rolled back");
            return error;
        }
        Ok(Err(e)) => Box::new(e),
        Err(e) => Box::new(e),
    };
    warn!(error = %failure, cause = %error, "rollback failed");
    TxError::Rollback {
        source: failure,
        suppressed: Box::new(error),
    }
    .into()
}

/// Clears the binding and releases the connection when dropped.
///
/// If dropped before [`settle`](Self::settle) the unit of work unwound, so
/// the transaction is rolled back first.
struct BindingScope<'a, C: TxConnection> {
    ctx: &'a ExecutionContext<C>,
    settled: bool,
}

impl<'a, C: TxConnection> BindingScope<'a, C> {
    fn new(ctx: &'a ExecutionContext<C>) -> Self {
        Self {
            ctx,
            settled: false,
        }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl<C: TxConnection> Drop for BindingScope<'_, C> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("unit of work panicked, rolling back");
            if let Ok(Err(e)) = self.ctx.with_connection_mut(|c| c.rollback()) {
                warn!(error = %e, "rollback after panic failed");
            }
        }
        if let Some(connection) = self.ctx.clear() {
            drop(connection);
            trace!("connection released");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
