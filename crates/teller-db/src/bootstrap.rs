//! One-time schema initialization from an embedded SQL script.
//!
//! Scripts are embedded at compile time via [`include_str!`] and registered
//! as [`ScriptResource`]s. The [`SchemaBootstrapper`] looks one up by name,
//! splits it on `;` and executes the statements in order inside a single
//! transaction on a fresh connection, so a failing statement leaves no
//! partial schema behind.
//!
//! The split is purely textual: scripts must not contain `;` inside string
//! literals or trigger bodies.

use std::sync::Arc;

use tracing::{debug, info};

use crate::database::Database;
use crate::errors::{DbError, Result};

/// Statement delimiter used by [`split_statements`].
pub const STATEMENT_DELIMITER: char = ';';

/// A named SQL script embedded in the binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptResource {
    /// Lookup name, e.g. `"bank.sql"`.
    pub name: &'static str,
    /// Script text.
    pub content: &'static str,
}

/// Split `script` into trimmed, non-empty statements.
pub fn split_statements(script: &str) -> Vec<&str> {
    script
        .split(STATEMENT_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Creates the schema on first start.
#[derive(Debug)]
pub struct SchemaBootstrapper {
    database: Arc<Database>,
    resources: &'static [ScriptResource],
    script_name: String,
    probe_table: String,
}

impl SchemaBootstrapper {
    /// Create a bootstrapper that runs `script_name` from `resources` and
    /// treats the existence of `probe_table` as "already initialized".
    pub fn new(
        database: Arc<Database>,
        resources: &'static [ScriptResource],
        script_name: impl Into<String>,
        probe_table: impl Into<String>,
    ) -> Self {
        Self {
            database,
            resources,
            script_name: script_name.into(),
            probe_table: probe_table.into(),
        }
    }

    /// Whether the probe table can be queried.
    ///
    /// Failing to get a connection is an error; any failure of the probe
    /// query itself means "not initialized".
    pub fn is_initialized(&self) -> Result<bool> {
        let conn = self.database.connection()?;
        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\"",
            self.probe_table.replace('"', "\"\"")
        );
        match conn.query_row(&sql, [], |row| row.get::<_, i64>(0)) {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(table = %self.probe_table, error = %e, "schema probe failed");
                Ok(false)
            }
        }
    }

    /// Execute every statement of the script. Returns the statement count.
    pub fn run(&self) -> Result<usize> {
        let script = self
            .resources
            .iter()
            .find(|r| r.name == self.script_name)
            .ok_or_else(|| DbError::ScriptNotFound(self.script_name.clone()))?;
        let statements = split_statements(script.content);

        let conn = self.database.connection()?;
        let tx = conn.unchecked_transaction()?;
        for (index, statement) in statements.iter().enumerate() {
            debug!(script = script.name, index, "executing statement");
            tx.execute_batch(statement)?;
        }
        tx.commit()?;

        info!(script = script.name, statements = statements.len(), "schema initialized");
        Ok(statements.len())
    }

    /// Run the script unless the schema already exists.
    ///
    /// Returns `true` if the script was run.
    pub fn ensure_initialized(&self) -> Result<bool> {
        if self.is_initialized()? {
            debug!(table = %self.probe_table, "schema already initialized");
            return Ok(false);
        }
        let _ = self.run()?;
        Ok(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
