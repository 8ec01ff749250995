//! # teller-tx
//!
//! Transactional execution core.
//!
//! A [`TransactionExecutor`] runs a unit of work against exactly one database
//! connection. The connection is bound into the caller's [`ExecutionContext`]
//! for the duration of the unit of work, committed when the work returns
//! `Ok`, rolled back when it returns `Err` or panics, and finally unbound and
//! released back to its [`ConnectionSource`] on every exit path.
//!
//! # Usage
//!
//! ```ignore
//! let executor = TransactionExecutor::new(database, NestingPolicy::Reuse);
//! let ctx = ExecutionContext::new();
//!
//! let count: i64 = executor.execute(&ctx, |ctx| {
//!     let conn = ctx.connection()?;
//!     Ok::<_, MyError>(conn.query_row("SELECT COUNT(*) FROM account", [], |r| r.get(0))?)
//! })?;
//! ```
//!
//! # Execution contexts
//!
//! An [`ExecutionContext`] is the per-task-of-control binding slot. It is
//! `Send` but not `Sync`: create one per thread or blocking task and pass it
//! explicitly. Two contexts never observe each other's connection.
//!
//! # Nesting
//!
//! Calling [`TransactionExecutor::execute`] from inside a unit of work with
//! the same context is governed by [`NestingPolicy`]:
//!
//! - [`NestingPolicy::Reuse`] joins the outer transaction; only the outermost
//!   call commits or rolls back.
//! - [`NestingPolicy::Strict`] rejects nesting with
//!   [`TxError::NestedTransaction`].

#![deny(unsafe_code)]

pub mod connection;
pub mod context;
pub mod errors;
pub mod executor;

pub use connection::{ConnectionSource, TxConnection};
pub use context::ExecutionContext;
pub use errors::{BoxError, Result, TxError};
pub use executor::{NestingPolicy, TransactionExecutor};
