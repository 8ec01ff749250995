//! Row-level access to the bank tables.
//!
//! Repositories never open transactions. They run on whatever connection
//! the caller hands them, which inside a service is the connection bound to
//! the current execution context.

pub mod account;
pub mod ledger;
pub mod payment_order;

pub use account::AccountRepo;
pub use ledger::LedgerRepo;
pub use payment_order::PaymentOrderRepo;
