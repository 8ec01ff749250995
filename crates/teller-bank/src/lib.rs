//! # teller-bank
//!
//! A small bank built on the transactional execution core.
//!
//! Customers hold personal accounts; the bank holds internal top-up and
//! withdrawal accounts. Requests become payment orders, and the
//! [`Transactor`] later settles each order by writing a ledger entry and
//! moving both balances in one transaction.
//!
//! Every service method takes the caller's [`Context`] and runs as one unit
//! of work on the shared [`Executor`]. Composing several calls inside an
//! outer `execute` joins them into one transaction under
//! [`NestingPolicy::Reuse`](teller_tx::NestingPolicy::Reuse) and is rejected
//! under [`NestingPolicy::Strict`](teller_tx::NestingPolicy::Strict).

#![deny(unsafe_code)]

use std::sync::Arc;

use teller_db::{Database, ScriptResource, SqliteConnection};
use teller_tx::{ExecutionContext, TransactionExecutor};

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

pub use domain::{Account, AccountType, LedgerTransaction, PaymentOrder, PaymentOrderState, StatementLine};
pub use errors::{BankError, Result};
pub use services::{
    AccountService, BankInitializer, BatchReport, Coordinator, LedgerService, PaymentOrderService,
    ProcessOutcome, Transactor,
};

/// Executor over the bank database.
pub type Executor = TransactionExecutor<Arc<Database>>;

/// Execution context holding a bank database connection.
pub type Context = ExecutionContext<SqliteConnection>;

/// Name of the bank schema script.
pub const SCHEMA_SCRIPT: &str = "bank.sql";

/// Table whose presence means the schema is in place.
pub const PROBE_TABLE: &str = "payment_order";

/// Embedded SQL scripts.
pub const SCRIPTS: &[ScriptResource] = &[ScriptResource {
    name: SCHEMA_SCRIPT,
    content: include_str!("../sql/bank.sql"),
}];


// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
