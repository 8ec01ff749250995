//! Error types for the database layer.

use teller_core::LifecycleError;
use thiserror::Error;

/// Errors raised by [`Database`](crate::Database) and
/// [`SchemaBootstrapper`](crate::SchemaBootstrapper).
#[derive(Debug, Error)]
pub enum DbError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error (pool build failure or acquisition timeout).
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Invalid start/stop transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Filesystem error while resolving or preparing the database path.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No script resource with the requested name was registered.
    #[error("script resource not found: {0}")]
    ScriptNotFound(String),

    /// A connection was requested while the database is not started.
    #[error("database is not running")]
    NotRunning,
}

/// Convenience type alias for database results.
pub type Result<T> = std::result::Result<T, DbError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
