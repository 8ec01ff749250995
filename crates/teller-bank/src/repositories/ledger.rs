//! Ledger repository.
//!
//! The ledger is append-only: one row per settled payment order, enforced by
//! the unique `po_id` column. An account's ledger balance is what it was
//! credited minus what it was debited, independent of the stored
//! `account.balance`.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

use crate::domain::{AccountType, LedgerTransaction, StatementLine, format_timestamp, parse_timestamp};
use crate::errors::Result;

struct LedgerRow {
    id: i64,
    payment_order_id: i64,
    from_account_id: i64,
    to_account_id: i64,
    amount: i64,
    date_transacted: String,
}

impl LedgerRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            payment_order_id: row.get(1)?,
            from_account_id: row.get(2)?,
            to_account_id: row.get(3)?,
            amount: row.get(4)?,
            date_transacted: row.get(5)?,
        })
    }

    fn into_transaction(self) -> Result<LedgerTransaction> {
        Ok(LedgerTransaction {
            id: self.id,
            payment_order_id: self.payment_order_id,
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount: self.amount,
            date_transacted: parse_timestamp(&self.date_transacted)?,
        })
    }
}

struct StatementRow {
    date_received: String,
    from_type: String,
    from_name: String,
    to_type: String,
    to_name: String,
    amount: i64,
    date_transacted: String,
}

impl StatementRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date_received: row.get(0)?,
            from_type: row.get(1)?,
            from_name: row.get(2)?,
            to_type: row.get(3)?,
            to_name: row.get(4)?,
            amount: row.get(5)?,
            date_transacted: row.get(6)?,
        })
    }

    fn into_line(self) -> Result<StatementLine> {
        let from_type: AccountType = self.from_type.parse()?;
        let to_type: AccountType = self.to_type.parse()?;
        Ok(StatementLine {
            payment_order_date_received: parse_timestamp(&self.date_received)?,
            from_account_name: from_type.public_name(&self.from_name).to_string(),
            to_account_name: to_type.public_name(&self.to_name).to_string(),
            amount: self.amount,
            date_transacted: parse_timestamp(&self.date_transacted)?,
        })
    }
}

/// Ledger repository. Stateless: every method takes `&Connection`.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Record money moved for `payment_order_id`.
    ///
    /// Fails with a constraint error if the order already has an entry.
    pub fn create(
        conn: &Connection,
        payment_order_id: i64,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
        date_transacted: DateTime<Utc>,
    ) -> Result<LedgerTransaction> {
        let _ = conn.execute(
            "INSERT INTO ledger_transaction (po_id, from_acc_id, to_acc_id, amount, date_transacted)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                payment_order_id,
                from_account_id,
                to_account_id,
                amount,
                format_timestamp(date_transacted)
            ],
        )?;
        Ok(LedgerTransaction {
            id: conn.last_insert_rowid(),
            payment_order_id,
            from_account_id,
            to_account_id,
            amount,
            date_transacted,
        })
    }

    /// Credits minus debits recorded for `account_id`.
    pub fn balance(conn: &Connection, account_id: i64) -> Result<i64> {
        Ok(conn.query_row(
            "SELECT COALESCE(SUM(CASE WHEN to_acc_id = ?1 THEN amount ELSE 0 END), 0)
                  - COALESCE(SUM(CASE WHEN from_acc_id = ?1 THEN amount ELSE 0 END), 0)
             FROM ledger_transaction
             WHERE from_acc_id = ?1 OR to_acc_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?)
    }

    /// Entries debiting or crediting `account_id`, oldest first.
    pub fn list_for_account(conn: &Connection, account_id: i64) -> Result<Vec<LedgerTransaction>> {
        let mut stmt = conn.prepare(
            "SELECT id, po_id, from_acc_id, to_acc_id, amount, date_transacted
             FROM ledger_transaction
             WHERE from_acc_id = ?1 OR to_acc_id = ?1
             ORDER BY date_transacted, id",
        )?;
        let rows = stmt
            .query_map(params![account_id], LedgerRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(LedgerRow::into_transaction).collect()
    }

    /// Entries for `account_id` joined with their order and counterpart
    /// names, oldest first. Internal accounts are masked.
    pub fn statement(conn: &Connection, account_id: i64) -> Result<Vec<StatementLine>> {
        let mut stmt = conn.prepare(
            "SELECT po.date_created, fa.type, fa.name, ta.type, ta.name, lt.amount, lt.date_transacted
             FROM ledger_transaction lt
             JOIN payment_order po ON po.id = lt.po_id
             JOIN account fa ON fa.id = lt.from_acc_id
             JOIN account ta ON ta.id = lt.to_acc_id
             WHERE lt.from_acc_id = ?1 OR lt.to_acc_id = ?1
             ORDER BY lt.date_transacted, lt.id",
        )?;
        let rows = stmt
            .query_map(params![account_id], StatementRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(StatementRow::into_line).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::domain::{PaymentOrderState, now};
    use crate::errors::BankError;
    use crate::repositories::{AccountRepo, PaymentOrderRepo};
    use crate::test_support::memory_conn;
    use assert_matches::assert_matches;

    struct Fixture {
        conn: Connection,
        bank: i64,
        amy: i64,
        bob: i64,
    }

    fn fixture() -> Fixture {
        let conn = memory_conn();
        let bank = AccountRepo::create(&conn, AccountType::TopUp, "Bank top-up account", now(), 1_000).unwrap().id;
        let amy = AccountRepo::create(&conn, AccountType::Personal, "Amy", now(), 0).unwrap().id;
        let bob = AccountRepo::create(&conn, AccountType::Personal, "Bob", now(), 0).unwrap().id;
        Fixture { conn, bank, amy, bob }
    }

    fn settle(conn: &Connection, from: i64, to: i64, amount: i64) -> LedgerTransaction {
        let order = PaymentOrderRepo::create(conn, from, to, amount, PaymentOrderState::Ok, now()).unwrap();
        LedgerRepo::create(conn, order.id, from, to, amount, now()).unwrap()
    }

    #[test]
    fn balance_is_credits_minus_debits() {
        let f = fixture();
        settle(&f.conn, f.bank, f.amy, 100);
        settle(&f.conn, f.amy, f.bob, 30);
        settle(&f.conn, f.bob, f.amy, 5);

        assert_eq!(LedgerRepo::balance(&f.conn, f.amy).unwrap(), 75);
        assert_eq!(LedgerRepo::balance(&f.conn, f.bob).unwrap(), 25);
        assert_eq!(LedgerRepo::balance(&f.conn, f.bank).unwrap(), -100);
    }

    #[test]
    fn balance_without_entries_is_zero() {
        let f = fixture();
        assert_eq!(LedgerRepo::balance(&f.conn, f.amy).unwrap(), 0);
    }

    #[test]
    fn one_entry_per_order() {
        let f = fixture();
        let entry = settle(&f.conn, f.bank, f.amy, 10);
        assert_matches!(
            LedgerRepo::create(&f.conn, entry.payment_order_id, f.bank, f.amy, 10, now()),
            Err(BankError::Sqlite(_))
        );
    }

    #[test]
    fn list_for_account_is_oldest_first() {
        let f = fixture();
        let first = settle(&f.conn, f.bank, f.amy, 10);
        let second = settle(&f.conn, f.amy, f.bob, 3);
        settle(&f.conn, f.bank, f.bob, 1);

        let entries = LedgerRepo::list_for_account(&f.conn, f.amy).unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[test]
    fn statement_masks_internal_accounts() {
        let f = fixture();
        settle(&f.conn, f.bank, f.amy, 10);
        settle(&f.conn, f.amy, f.bob, 4);

        let lines = LedgerRepo::statement(&f.conn, f.amy).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].from_account_name, "<internal top-up>");
        assert_eq!(lines[0].to_account_name, "Amy");
        assert_eq!(lines[1].from_account_name, "Amy");
        assert_eq!(lines[1].to_account_name, "Bob");
        assert_eq!(lines[1].amount, 4);
    }
}
