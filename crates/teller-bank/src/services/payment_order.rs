//! Accepting payment requests.
//!
//! Every request becomes a [`PaymentOrder`] in the `RECEIVED` state. No money
//! moves here; the [`Transactor`](crate::services::Transactor) settles orders
//! later.

use std::sync::Arc;

use rusqlite::Connection;
use tracing::info;

use crate::domain::{Account, PaymentOrder, PaymentOrderState, now};
use crate::errors::{BankError, Result};
use crate::repositories::PaymentOrderRepo;
use crate::services::account::{find_account, find_top_up_account, find_withdrawal_account};
use crate::{Context, Executor};

/// Turns customer requests into payment orders.
#[derive(Clone, Debug)]
pub struct PaymentOrderService {
    executor: Arc<Executor>,
}

impl PaymentOrderService {
    /// Create a service running its work on `executor`.
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// Order a payment between two distinct personal accounts.
    pub fn receive_payment_request(
        &self,
        ctx: &Context,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<PaymentOrder> {
        self.executor.execute(ctx, |ctx| {
            check_amount(amount)?;
            let conn = ctx.connection()?;
            let from = find_account(&conn, from_account_id)?;
            let to = find_account(&conn, to_account_id)?;
            if from.id == to.id || !(from.is_personal() && to.is_personal()) {
                return Err(BankError::InvalidPaymentRequest {
                    from: from_account_id,
                    to: to_account_id,
                });
            }
            create_order(&conn, &from, &to, amount)
        })
    }

    /// Order money from the bank's top-up account into a personal account.
    pub fn top_up_request(&self, ctx: &Context, account_id: i64, amount: i64) -> Result<PaymentOrder> {
        self.executor.execute(ctx, |ctx| {
            check_amount(amount)?;
            let conn = ctx.connection()?;
            let account = personal_account(&conn, account_id, "top-up request")?;
            let top_up = find_top_up_account(&conn)?;
            create_order(&conn, &top_up, &account, amount)
        })
    }

    /// Order money from a personal account into the bank's withdrawal account.
    pub fn withdrawal_request(&self, ctx: &Context, account_id: i64, amount: i64) -> Result<PaymentOrder> {
        self.executor.execute(ctx, |ctx| {
            check_amount(amount)?;
            let conn = ctx.connection()?;
            let account = personal_account(&conn, account_id, "withdrawal request")?;
            let withdrawal = find_withdrawal_account(&conn)?;
            create_order(&conn, &account, &withdrawal, amount)
        })
    }

    /// Current state of order `id`.
    pub fn payment_order_state(&self, ctx: &Context, id: i64) -> Result<PaymentOrderState> {
        self.find_payment_order(ctx, id).map(|order| order.state)
    }

    /// Order `id`, or [`BankError::PaymentOrderNotFound`].
    pub fn find_payment_order(&self, ctx: &Context, id: i64) -> Result<PaymentOrder> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            find_payment_order(&conn, id)
        })
    }

    /// Orders paid from or to a personal account, oldest first.
    pub fn list_orders_for_personal_account(&self, ctx: &Context, account_id: i64) -> Result<Vec<PaymentOrder>> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            let account = personal_account(&conn, account_id, "list request")?;
            PaymentOrderRepo::list_for_account(&conn, account.id)
        })
    }

    /// Up to `limit` received orders waiting for the transactor, oldest first.
    pub fn list_orders_to_process(&self, ctx: &Context, limit: usize) -> Result<Vec<PaymentOrder>> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            PaymentOrderRepo::list_by_state(&conn, PaymentOrderState::Received, limit)
        })
    }
}

fn check_amount(amount: i64) -> Result<()> {
    if amount > 0 {
        Ok(())
    } else {
        Err(BankError::InvalidAmount(amount))
    }
}

fn personal_account(conn: &Connection, account_id: i64, action: &'static str) -> Result<Account> {
    let account = find_account(conn, account_id)?;
    if account.is_personal() {
        Ok(account)
    } else {
        Err(BankError::InvalidAccountRequest { account_id, action })
    }
}

fn create_order(conn: &Connection, from: &Account, to: &Account, amount: i64) -> Result<PaymentOrder> {
    let order = PaymentOrderRepo::create(conn, from.id, to.id, amount, PaymentOrderState::Received, now())?;
    info!(
        payment_order_id = order.id,
        from_account_id = from.id,
        to_account_id = to.id,
        amount,
        "payment order received"
    );
    Ok(order)
}

pub(crate) fn find_payment_order(conn: &Connection, id: i64) -> Result<PaymentOrder> {
    PaymentOrderRepo::find(conn, id)?.ok_or(BankError::PaymentOrderNotFound(id))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
