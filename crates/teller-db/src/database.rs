//! The process-wide connection source.
//!
//! A [`Database`] owns one `SQLite` file and, while started, one r2d2 pool
//! over it. It is started and stopped exactly once; stopping drops the pool
//! but never deletes the file.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use teller_core::Lifecycle;
use teller_tx::{ConnectionSource, TxError};
use tracing::{debug, info};

use crate::connection::{self, ConnectionConfig, ConnectionPool, SqliteConnection};
use crate::errors::{DbError, Result};

/// Pooled `SQLite` connection source with a one-shot lifecycle.
pub struct Database {
    path: PathBuf,
    config: ConnectionConfig,
    lifecycle: Lifecycle,
    pool: RwLock<Option<ConnectionPool>>,
}

impl Database {
    /// Create a stopped database for the file at `path`.
    ///
    /// Relative paths are resolved against the current directory.
    pub fn new(path: impl AsRef<Path>, config: ConnectionConfig) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        Ok(Self {
            path,
            config,
            lifecycle: Lifecycle::new("database"),
            pool: RwLock::new(None),
        })
    }

    /// Absolute path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pool configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open the pool.
    ///
    /// Fails with `AlreadyStarted` if running, `AlreadyStopped` once stopped.
    /// If the pool cannot be built the database stays unstarted.
    pub fn start(&self) -> Result<()> {
        self.lifecycle.start()?;
        match self.open_pool() {
            Ok(pool) => {
                *self.pool.write() = Some(pool);
                info!(path = %self.path.display(), pool_size = self.config.pool_size, "database started");
                Ok(())
            }
            Err(e) => {
                self.lifecycle.abort_start();
                Err(e)
            }
        }
    }

    /// Close the pool. Connections still checked out stay usable until dropped.
    ///
    /// Fails with `AlreadyStopped` unless running.
    pub fn stop(&self) -> Result<()> {
        self.lifecycle.stop()?;
        let pool = self.pool.write().take();
        drop(pool);
        info!(path = %self.path.display(), "database stopped");
        Ok(())
    }

    /// Whether the pool is open.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Check out a connection in auto-commit mode.
    pub fn connection(&self) -> Result<SqliteConnection> {
        let pool = self.pool.read().clone().ok_or(DbError::NotRunning)?;
        let conn = pool.get()?;
        Ok(SqliteConnection::new(conn))
    }

    fn open_pool(&self) -> Result<ConnectionPool> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                debug!(dir = %parent.display(), "creating database directory");
                std::fs::create_dir_all(parent)?;
            }
        }
        connection::new_file(&self.path, &self.config)
    }
}

impl ConnectionSource for Database {
    type Connection = SqliteConnection;

    fn acquire(&self) -> std::result::Result<SqliteConnection, TxError> {
        self.connection().map_err(TxError::acquisition)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("state", &self.lifecycle.state())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use teller_core::LifecycleError;

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            pool_size: 2,
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn new_resolves_relative_path() {
        let db = Database::new("relative/bank.db", config()).unwrap();
        assert!(db.path().is_absolute());
        assert!(db.path().ends_with("relative/bank.db"));
        assert!(!db.is_running());
    }

    #[test]
    fn start_creates_parent_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("bank.db");
        let db = Database::new(&path, config()).unwrap();

        db.start().unwrap();

        assert!(db.is_running());
        assert!(path.exists());
    }

    #[test]
    fn start_twice_fails_already_started() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("bank.db"), config()).unwrap();
        db.start().unwrap();
        assert_matches!(
            db.start(),
            Err(DbError::Lifecycle(LifecycleError::AlreadyStarted(_)))
        );
        assert!(db.is_running());
    }

    #[test]
    fn stop_without_start_fails_already_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("bank.db"), config()).unwrap();
        assert_matches!(
            db.stop(),
            Err(DbError::Lifecycle(LifecycleError::AlreadyStopped(_)))
        );
    }

    #[test]
    fn stop_twice_fails_already_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("bank.db"), config()).unwrap();
        db.start().unwrap();
        db.stop().unwrap();
        assert_matches!(
            db.stop(),
            Err(DbError::Lifecycle(LifecycleError::AlreadyStopped(_)))
        );
    }

    #[test]
    fn stop_keeps_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.db");
        let db = Database::new(&path, config()).unwrap();
        db.start().unwrap();
        db.stop().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn connection_before_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("bank.db"), config()).unwrap();
        assert_matches!(db.connection(), Err(DbError::NotRunning));
        assert_matches!(db.acquire(), Err(TxError::ConnectionAcquisition(_)));
    }

    #[test]
    fn connection_after_stop_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("bank.db"), config()).unwrap();
        db.start().unwrap();
        db.stop().unwrap();
        assert_matches!(db.connection(), Err(DbError::NotRunning));
    }

    #[test]
    fn checked_out_connection_survives_stop() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("bank.db"), config()).unwrap();
        db.start().unwrap();
        let conn = db.connection().unwrap();
        db.stop().unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |r| r.get(0)).unwrap();
        assert_eq!(one, 1);
    }

    #[test]
    fn exhausted_pool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectionConfig {
            pool_size: 1,
            connection_timeout_ms: 100,
            ..ConnectionConfig::default()
        };
        let db = Database::new(dir.path().join("bank.db"), config).unwrap();
        db.start().unwrap();

        let _held = db.connection().unwrap();

        assert_matches!(db.connection(), Err(DbError::Pool(_)));
        assert_matches!(db.acquire(), Err(TxError::ConnectionAcquisition(_)));
    }

    #[test]
    fn failed_start_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let config = ConnectionConfig {
            pool_size: 1,
            connection_timeout_ms: 200,
            ..ConnectionConfig::default()
        };
        let db = Database::new(blocker.join("bank.db"), config).unwrap();

        assert!(db.start().is_err());
        assert!(!db.is_running());

        std::fs::remove_file(&blocker).unwrap();
        db.start().unwrap();
        assert!(db.is_running());
    }

    #[test]
    fn debug_shows_state() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("bank.db"), config()).unwrap();
        assert!(format!("{db:?}").contains("Unstarted"));
    }
}
