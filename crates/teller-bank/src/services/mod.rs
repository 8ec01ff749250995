//! Bank services.
//!
//! Every public service method is one unit of work: it takes the caller's
//! [`Context`](crate::Context) and runs inside
//! [`TransactionExecutor::execute`](teller_tx::TransactionExecutor::execute).
//! Services reuse each other's connection-level helpers rather than each
//! other's methods, so no service call opens a nested unit of work.

pub mod account;
pub mod coordinator;
pub mod initializer;
pub mod ledger;
pub mod payment_order;
pub mod transactor;

pub use account::AccountService;
pub use coordinator::{BatchReport, Coordinator};
pub use initializer::BankInitializer;
pub use ledger::LedgerService;
pub use payment_order::PaymentOrderService;
pub use transactor::{ProcessOutcome, Transactor};
