//! `SQLite` connection pool and the transactional connection wrapper.
//!
//! Uses `r2d2` connection pooling with the `r2d2_sqlite` backend. The
//! [`PragmaCustomizer`] runs on each new connection to set the busy timeout,
//! WAL mode, foreign keys and the page cache size.

use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use teller_tx::TxConnection;
use tracing::warn;

use crate::errors::{DbError, Result};

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Configuration for the connection pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 16).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 30000).
    pub busy_timeout_ms: u32,
    /// Cache size in KiB (default: 8192 = 8 MB).
    pub cache_size_kib: i64,
    /// How long an acquire waits for a free connection (default: 5000).
    pub connection_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            busy_timeout_ms: 30_000,
            cache_size_kib: 8192,
            connection_timeout_ms: 5_000,
        }
    }
}

/// `SQLite` pragma customizer that runs on each new connection.
#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
    cache_size_kib: i64,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        // busy_timeout first so the WAL switch waits on concurrently opening peers.
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};\
             PRAGMA journal_mode = WAL;\
             PRAGMA foreign_keys = ON;\
             PRAGMA cache_size = -{};\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms, self.cache_size_kib
        ))?;
        Ok(())
    }
}

/// Create a file-backed connection pool.
pub fn new_file(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
            cache_size_kib: config.cache_size_kib,
        }))
        .build(manager)?;
    Ok(pool)
}

/// A pooled connection that can run one manual transaction at a time.
///
/// Dereferences to [`rusqlite::Connection`]. Dropping it rolls back any
/// transaction still open and returns the underlying connection to the pool.
pub struct SqliteConnection {
    inner: r2d2::PooledConnection<SqliteConnectionManager>,
}

impl SqliteConnection {
    pub(crate) fn new(inner: r2d2::PooledConnection<SqliteConnectionManager>) -> Self {
        Self { inner }
    }
}

impl Deref for SqliteConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.inner
    }
}

impl DerefMut for SqliteConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.inner
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if !self.inner.is_autocommit() {
            warn!("connection released mid-transaction, rolling back");
            if let Err(e) = self.inner.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback on release failed");
            }
        }
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("autocommit", &self.inner.is_autocommit())
            .finish()
    }
}

impl TxConnection for SqliteConnection {
    type Error = rusqlite::Error;

    fn begin(&mut self) -> std::result::Result<(), rusqlite::Error> {
        if !self.inner.is_autocommit() {
            // Rollback on release can fail and leave a transaction open.
            warn!("discarding transaction left open on pooled connection");
            self.inner.execute_batch("ROLLBACK")?;
        }
        self.inner.execute_batch("BEGIN IMMEDIATE")
    }

    fn commit(&mut self) -> std::result::Result<(), rusqlite::Error> {
        self.inner.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> std::result::Result<(), rusqlite::Error> {
        if self.inner.is_autocommit() {
            // SQLite already rolled back on its own (e.g. SQLITE_FULL).
            return Ok(());
        }
        self.inner.execute_batch("ROLLBACK")
    }
}

/// Verify pragmas are set correctly on a connection.
pub fn verify_pragmas(conn: &Connection) -> Result<PragmaState> {
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .map_err(DbError::Sqlite)?;
    let foreign_keys: i32 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .map_err(DbError::Sqlite)?;
    let busy_timeout_ms: u32 = conn
        .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
        .map_err(DbError::Sqlite)?;
    Ok(PragmaState {
        journal_mode,
        foreign_keys_enabled: foreign_keys == 1,
        busy_timeout_ms,
    })
}

/// Pragma state for verification.
#[derive(Debug)]
pub struct PragmaState {
    /// Journal mode (should be "wal").
    pub journal_mode: String,
    /// Whether foreign keys are enabled.
    pub foreign_keys_enabled: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
