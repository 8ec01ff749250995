//! Bank domain types.
//!
//! Amounts and balances are integer minor units (cents). Timestamps are UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::BankError;

/// Kind of account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Customer account.
    Personal,
    /// Internal account money is topped up from.
    TopUp,
    /// Internal account money is withdrawn to.
    Withdrawal,
}

impl AccountType {
    /// Name shown to customers for an account of this type called `name`.
    ///
    /// Internal accounts are masked.
    pub fn public_name(self, name: &str) -> &str {
        match self {
            Self::Personal => name,
            Self::TopUp => "<internal top-up>",
            Self::Withdrawal => "<internal withdrawal>",
        }
    }

    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "PERSONAL",
            Self::TopUp => "TOP_UP",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERSONAL" => Ok(Self::Personal),
            "TOP_UP" => Ok(Self::TopUp),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            other => Err(BankError::InvalidData(format!("unknown account type '{other}'"))),
        }
    }
}

/// A bank account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Row id.
    pub id: i64,
    /// Kind of account.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Display name.
    pub name: String,
    /// When the account was opened.
    pub date_opened: DateTime<Utc>,
    /// Current balance in minor units.
    pub balance: i64,
    /// Optimistic-locking version.
    pub version: i64,
}

impl Account {
    /// Whether this is a customer account.
    pub fn is_personal(&self) -> bool {
        self.account_type == AccountType::Personal
    }

    /// Name shown to customers; internal accounts are masked.
    pub fn public_name(&self) -> &str {
        self.account_type.public_name(&self.name)
    }
}

/// Processing state of a payment order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOrderState {
    /// Accepted, waiting for the transactor.
    Received,
    /// Money was sent.
    Ok,
    /// Rejected because the paying account lacked funds.
    NoFunds,
}

impl PaymentOrderState {
    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Ok => "OK",
            Self::NoFunds => "NO_FUNDS",
        }
    }
}

impl fmt::Display for PaymentOrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentOrderState {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(Self::Received),
            "OK" => Ok(Self::Ok),
            "NO_FUNDS" => Ok(Self::NoFunds),
            other => Err(BankError::InvalidData(format!("unknown payment order state '{other}'"))),
        }
    }
}

/// A request to move money between two accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    /// Row id.
    pub id: i64,
    /// Paying account.
    pub from_account_id: i64,
    /// Receiving account.
    pub to_account_id: i64,
    /// Amount in minor units.
    pub amount: i64,
    /// Processing state.
    pub state: PaymentOrderState,
    /// When the order was received.
    pub date_created: DateTime<Utc>,
    /// Optimistic-locking version.
    pub version: i64,
}

/// A ledger entry recording money sent for one payment order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    /// Row id.
    pub id: i64,
    /// Order this entry settles.
    pub payment_order_id: i64,
    /// Debited account.
    pub from_account_id: i64,
    /// Credited account.
    pub to_account_id: i64,
    /// Amount in minor units.
    pub amount: i64,
    /// When the money moved.
    pub date_transacted: DateTime<Utc>,
}

/// One line of an account statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementLine {
    /// When the settled order was received.
    pub payment_order_date_received: DateTime<Utc>,
    /// Public name of the debited account.
    pub from_account_name: String,
    /// Public name of the credited account.
    pub to_account_name: String,
    /// Amount in minor units.
    pub amount: i64,
    /// When the money moved.
    pub date_transacted: DateTime<Utc>,
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC timestamp text, so stored values sort chronologically.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, BankError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| BankError::InvalidData(format!("bad timestamp '{raw}': {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
