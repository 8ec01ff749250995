//! Account repository.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{Account, AccountType, format_timestamp, parse_timestamp};
use crate::errors::{BankError, Result};

const COLUMNS: &str = "id, type, name, date_opened, balance, version";

/// Raw `account` row.
struct AccountRow {
    id: i64,
    account_type: String,
    name: String,
    date_opened: String,
    balance: i64,
    version: i64,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_type: row.get(1)?,
            name: row.get(2)?,
            date_opened: row.get(3)?,
            balance: row.get(4)?,
            version: row.get(5)?,
        })
    }

    fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: self.id,
            account_type: self.account_type.parse()?,
            name: self.name,
            date_opened: parse_timestamp(&self.date_opened)?,
            balance: self.balance,
            version: self.version,
        })
    }
}

/// Account repository. Stateless: every method takes `&Connection`.
pub struct AccountRepo;

impl AccountRepo {
    /// Insert a new account at version 0.
    pub fn create(
        conn: &Connection,
        account_type: AccountType,
        name: &str,
        date_opened: DateTime<Utc>,
        balance: i64,
    ) -> Result<Account> {
        let _ = conn.execute(
            "INSERT INTO account (type, name, date_opened, balance, version)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![account_type.as_str(), name, format_timestamp(date_opened), balance],
        )?;
        Ok(Account {
            id: conn.last_insert_rowid(),
            account_type,
            name: name.to_string(),
            date_opened,
            balance,
            version: 0,
        })
    }

    /// Find an account by id.
    pub fn find(conn: &Connection, id: i64) -> Result<Option<Account>> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM account WHERE id = ?1"),
            params![id],
            AccountRow::from_row,
        )
        .optional()?
        .map(AccountRow::into_account)
        .transpose()
    }

    /// All accounts ordered by name.
    pub fn list(conn: &Connection) -> Result<Vec<Account>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM account ORDER BY name, id"))?;
        let rows = stmt
            .query_map([], AccountRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(AccountRow::into_account).collect()
    }

    /// Accounts of one type ordered by name.
    pub fn list_by_type(conn: &Connection, account_type: AccountType) -> Result<Vec<Account>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM account WHERE type = ?1 ORDER BY name, id"
        ))?;
        let rows = stmt
            .query_map(params![account_type.as_str()], AccountRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(AccountRow::into_account).collect()
    }

    /// Store a new balance if `account.version` is still current.
    ///
    /// Returns the account with the new balance and bumped version, or
    /// [`BankError::ConcurrentModification`] if the row changed since it
    /// was read.
    pub fn update_balance(conn: &Connection, account: &Account, balance: i64) -> Result<Account> {
        let changed = conn.execute(
            "UPDATE account SET balance = ?1, version = version + 1
             WHERE id = ?2 AND version = ?3",
            params![balance, account.id, account.version],
        )?;
        if changed == 0 {
            return Err(BankError::ConcurrentModification {
                entity: "account",
                id: account.id,
            });
        }
        Ok(Account {
            balance,
            version: account.version + 1,
            ..account.clone()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
