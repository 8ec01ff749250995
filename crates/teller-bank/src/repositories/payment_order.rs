//! Payment order repository.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{PaymentOrder, PaymentOrderState, format_timestamp, parse_timestamp};
use crate::errors::{BankError, Result};

const COLUMNS: &str = "id, from_acc_id, to_acc_id, amount, state, date_created, version";

/// Raw `payment_order` row.
struct PaymentOrderRow {
    id: i64,
    from_account_id: i64,
    to_account_id: i64,
    amount: i64,
    state: String,
    date_created: String,
    version: i64,
}

impl PaymentOrderRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            from_account_id: row.get(1)?,
            to_account_id: row.get(2)?,
            amount: row.get(3)?,
            state: row.get(4)?,
            date_created: row.get(5)?,
            version: row.get(6)?,
        })
    }

    fn into_order(self) -> Result<PaymentOrder> {
        Ok(PaymentOrder {
            id: self.id,
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount: self.amount,
            state: self.state.parse()?,
            date_created: parse_timestamp(&self.date_created)?,
            version: self.version,
        })
    }
}

fn collect(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> Result<Vec<PaymentOrder>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(args, PaymentOrderRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(PaymentOrderRow::into_order).collect()
}

/// Payment order repository. Stateless: every method takes `&Connection`.
pub struct PaymentOrderRepo;

impl PaymentOrderRepo {
    /// Insert a new order at version 0.
    pub fn create(
        conn: &Connection,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
        state: PaymentOrderState,
        date_created: DateTime<Utc>,
    ) -> Result<PaymentOrder> {
        let _ = conn.execute(
            "INSERT INTO payment_order (from_acc_id, to_acc_id, amount, state, date_created, version)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                from_account_id,
                to_account_id,
                amount,
                state.as_str(),
                format_timestamp(date_created)
            ],
        )?;
        Ok(PaymentOrder {
            id: conn.last_insert_rowid(),
            from_account_id,
            to_account_id,
            amount,
            state,
            date_created,
            version: 0,
        })
    }

    /// Find an order by id.
    pub fn find(conn: &Connection, id: i64) -> Result<Option<PaymentOrder>> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM payment_order WHERE id = ?1"),
            params![id],
            PaymentOrderRow::from_row,
        )
        .optional()?
        .map(PaymentOrderRow::into_order)
        .transpose()
    }

    /// Up to `limit` orders in `state`, oldest first.
    pub fn list_by_state(conn: &Connection, state: PaymentOrderState, limit: usize) -> Result<Vec<PaymentOrder>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        collect(
            conn,
            &format!(
                "SELECT {COLUMNS} FROM payment_order WHERE state = ?1
                 ORDER BY date_created, id LIMIT ?2"
            ),
            params![state.as_str(), limit],
        )
    }

    /// Orders paid from or to `account_id`, oldest first.
    pub fn list_for_account(conn: &Connection, account_id: i64) -> Result<Vec<PaymentOrder>> {
        collect(
            conn,
            &format!(
                "SELECT {COLUMNS} FROM payment_order WHERE from_acc_id = ?1 OR to_acc_id = ?1
                 ORDER BY date_created, id"
            ),
            params![account_id],
        )
    }

    /// Move `order` to `state` if `order.version` is still current.
    pub fn update_state(conn: &Connection, order: &PaymentOrder, state: PaymentOrderState) -> Result<PaymentOrder> {
        let changed = conn.execute(
            "UPDATE payment_order SET state = ?1, version = version + 1
             WHERE id = ?2 AND version = ?3",
            params![state.as_str(), order.id, order.version],
        )?;
        if changed == 0 {
            return Err(BankError::ConcurrentModification {
                entity: "payment_order",
                id: order.id,
            });
        }
        Ok(PaymentOrder {
            state,
            version: order.version + 1,
            ..order.clone()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
