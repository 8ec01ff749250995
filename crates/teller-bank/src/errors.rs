//! Error types for the bank services.
//!
//! [`BankError`] is the error type of every bank unit of work, so it absorbs
//! [`TxError`] (executor failures) and [`rusqlite::Error`] (query failures)
//! alongside the business rule violations.

use teller_tx::TxError;
use thiserror::Error;

use crate::domain::AccountType;

/// Errors raised by bank services and repositories.
#[derive(Debug, Error)]
pub enum BankError {
    /// Transaction executor failure.
    #[error(transparent)]
    Tx(#[from] TxError),

    /// `SQLite` query failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No account with this id.
    #[error("unable to find account.id={0}")]
    AccountNotFound(i64),

    /// No payment order with this id.
    #[error("unable to find paymentOrder.id={0}")]
    PaymentOrderNotFound(i64),

    /// Amount must be strictly positive.
    #[error("invalid amount value: {0}")]
    InvalidAmount(i64),

    /// Account name must not be blank.
    #[error("account name cannot be empty")]
    InvalidName,

    /// Payments are only allowed between two personal accounts.
    #[error("invalid payment request from account.id={from} to account.id={to}")]
    InvalidPaymentRequest {
        /// Paying account.
        from: i64,
        /// Receiving account.
        to: i64,
    },

    /// The action is only allowed on personal accounts.
    #[error("invalid {action} for account.id={account_id}")]
    InvalidAccountRequest {
        /// Account the action targeted.
        account_id: i64,
        /// What was attempted, e.g. `"top-up request"`.
        action: &'static str,
    },

    /// The internal account of this type does not exist.
    #[error("unable to find any {0} account")]
    MissingBankAccount(AccountType),

    /// A row changed since it was read.
    #[error("{entity}.id={id} was modified concurrently")]
    ConcurrentModification {
        /// Table name.
        entity: &'static str,
        /// Row id.
        id: i64,
    },

    /// Settling the order would push a balance past the `i64` range.
    #[error("balance of account.id={account_id} would overflow")]
    BalanceOverflow {
        /// Account whose balance cannot absorb the amount.
        account_id: i64,
    },

    /// A stored value could not be decoded.
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

impl BankError {
    /// Whether the error is the caller's fault rather than the system's.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InvalidName
                | Self::InvalidPaymentRequest { .. }
                | Self::InvalidAccountRequest { .. }
        )
    }

    /// Whether the error reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AccountNotFound(_) | Self::PaymentOrderNotFound(_))
    }
}

/// Convenience type alias for bank results.
pub type Result<T> = std::result::Result<T, BankError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_not_found_display() {
        assert_eq!(
            BankError::AccountNotFound(7).to_string(),
            "unable to find account.id=7"
        );
    }

    #[test]
    fn invalid_account_request_display() {
        let err = BankError::InvalidAccountRequest {
            account_id: 3,
            action: "top-up request",
        };
        assert_eq!(err.to_string(), "invalid top-up request for account.id=3");
    }

    #[test]
    fn missing_bank_account_display() {
        assert_eq!(
            BankError::MissingBankAccount(AccountType::TopUp).to_string(),
            "unable to find any TOP_UP account"
        );
    }

    #[test]
    fn tx_error_is_transparent() {
        let err = BankError::from(TxError::NestedTransaction);
        assert_eq!(err.to_string(), "unable to nest transactions");
    }

    #[test]
    fn classification() {
        assert!(BankError::InvalidName.is_client_error());
        assert!(!BankError::InvalidName.is_not_found());
        assert!(BankError::PaymentOrderNotFound(1).is_not_found());
        assert!(!BankError::InvalidData("x".into()).is_client_error());
        assert!(!BankError::BalanceOverflow { account_id: 1 }.is_client_error());
    }
}
