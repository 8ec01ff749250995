//! Server, coordinator, bank bootstrap and logging settings.
//!
//! These are grouped here because they are all small and describe the
//! running service rather than storage.

use serde::{Deserialize, Serialize};

/// HTTP listener settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (0 picks an ephemeral port).
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Background payment-order processing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoordinatorSettings {
    /// Whether the coordinator polls at all.
    pub enabled: bool,
    /// Delay before the first poll, in milliseconds.
    pub initial_delay_ms: u64,
    /// Interval between polls, in milliseconds.
    pub period_ms: u64,
    /// Maximum number of orders taken per poll.
    pub batch_size: usize,
    /// Worker threads processing one batch.
    pub workers: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 1_000,
            period_ms: 1_000,
            batch_size: 100,
            workers: 4,
        }
    }
}

/// Internal bank accounts created on first start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankSettings {
    /// Name of the top-up account.
    pub top_up_account_name: String,
    /// Opening balance of the top-up account, in minor units.
    pub top_up_balance: i64,
    /// Name of the withdrawal account.
    pub withdrawal_account_name: String,
    /// Opening balance of the withdrawal account, in minor units.
    pub withdrawal_balance: i64,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            top_up_account_name: "Bank top-up account".to_string(),
            top_up_balance: 99_999_900,
            withdrawal_account_name: "Bank withdrawal account".to_string(),
            withdrawal_balance: 99_999_900,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive (`RUST_LOG` wins when set).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
