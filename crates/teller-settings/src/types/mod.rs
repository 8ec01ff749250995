//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a settings file only needs the fields it changes.

mod service;
mod storage;

pub use service::*;
pub use storage::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "database": { "path": "bank.db", "poolSize": 8 },
///   "transactions": { "nesting": "strict" },
///   "server": { "port": 9090 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TellerSettings {
    /// Database file and pool.
    pub database: DatabaseSettings,
    /// Transaction executor behavior.
    pub transactions: TransactionSettings,
    /// HTTP listener.
    pub server: ServerSettings,
    /// Background payment-order processing.
    pub coordinator: CoordinatorSettings,
    /// Internal bank accounts.
    pub bank: BankSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl TellerSettings {
    /// Reject values the application cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SettingsError::InvalidValue(msg.to_string()));

        if self.database.path.trim().is_empty() {
            return invalid("database.path must not be empty");
        }
        if self.database.pool_size == 0 {
            return invalid("database.poolSize must be at least 1");
        }
        if self.coordinator.period_ms == 0 {
            return invalid("coordinator.periodMs must be at least 1");
        }
        if self.coordinator.batch_size == 0 {
            return invalid("coordinator.batchSize must be at least 1");
        }
        if self.coordinator.workers == 0 {
            return invalid("coordinator.workers must be at least 1");
        }
        if self.bank.top_up_balance < 0 || self.bank.withdrawal_balance < 0 {
            return invalid("bank balances must not be negative");
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
