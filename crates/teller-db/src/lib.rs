//! # teller-db
//!
//! `SQLite` storage for teller.
//!
//! - [`Database`]: the process-wide connection source, an r2d2 pool over one
//!   database file with a one-shot start/stop lifecycle. It implements
//!   [`teller_tx::ConnectionSource`], handing out [`SqliteConnection`]s that
//!   implement [`teller_tx::TxConnection`].
//! - [`SchemaBootstrapper`]: creates the schema from an embedded script the
//!   first time the application starts against an empty file.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod connection;
pub mod database;
pub mod errors;

pub use bootstrap::{STATEMENT_DELIMITER, SchemaBootstrapper, ScriptResource, split_statements};
pub use connection::{ConnectionConfig, ConnectionPool, PragmaState, SqliteConnection, verify_pragmas};
pub use database::Database;
pub use errors::{DbError, Result};
