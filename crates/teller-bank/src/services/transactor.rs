//! Settles payment orders.
//!
//! Settling an order is one unit of work: re-read the order and both
//! accounts, then either mark the order `NO_FUNDS` or write the ledger
//! entry, move both balances and mark the order `OK`. `BEGIN IMMEDIATE`
//! serializes writers, so two workers racing on the same order cannot both
//! send money; the loser sees a non-`RECEIVED` state and backs off.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{PaymentOrder, PaymentOrderState, now};
use crate::errors::{BankError, Result};
use crate::repositories::{AccountRepo, LedgerRepo, PaymentOrderRepo};
use crate::services::account::find_account;
use crate::services::payment_order::find_payment_order;
use crate::{Context, Executor};

/// What [`Transactor::process`] did with an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessOutcome {
    /// The transactor is stopped; the order was left alone.
    Stopped,
    /// The order was no longer `RECEIVED`.
    InvalidState,
    /// The paying personal account could not cover the amount.
    NoFunds,
    /// Money moved and the order is `OK`.
    MoneySent,
}

/// Moves money for received payment orders.
#[derive(Debug)]
pub struct Transactor {
    executor: Arc<Executor>,
    running: AtomicBool,
}

impl Transactor {
    /// Create a stopped transactor.
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            running: AtomicBool::new(false),
        }
    }

    /// Accept orders from now on.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!("transactor started");
    }

    /// Leave orders alone from now on. Orders already being settled finish.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("transactor stopped");
    }

    /// Whether orders are being accepted.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Settle `order`.
    ///
    /// Only the order id is trusted; its state and both accounts are
    /// re-read inside the transaction.
    pub fn process(&self, ctx: &Context, order: &PaymentOrder) -> Result<ProcessOutcome> {
        if !self.is_running() {
            info!(payment_order_id = order.id, "transactor not running, skipping");
            return Ok(ProcessOutcome::Stopped);
        }

        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            let order = find_payment_order(&conn, order.id)?;
            if order.state != PaymentOrderState::Received {
                debug!(payment_order_id = order.id, state = %order.state, "already processed, skipping");
                return Ok(ProcessOutcome::InvalidState);
            }

            let from = find_account(&conn, order.from_account_id)?;
            let to = find_account(&conn, order.to_account_id)?;

            if from.is_personal() && from.balance < order.amount {
                info!(
                    payment_order_id = order.id,
                    from_account_id = from.id,
                    balance = from.balance,
                    amount = order.amount,
                    "insufficient funds"
                );
                let _ = PaymentOrderRepo::update_state(&conn, &order, PaymentOrderState::NoFunds)?;
                return Ok(ProcessOutcome::NoFunds);
            }

            let from_balance = from
                .balance
                .checked_sub(order.amount)
                .ok_or(BankError::BalanceOverflow { account_id: from.id })?;
            let to_balance = to
                .balance
                .checked_add(order.amount)
                .ok_or(BankError::BalanceOverflow { account_id: to.id })?;

            let entry = LedgerRepo::create(&conn, order.id, from.id, to.id, order.amount, now())?;
            let _ = AccountRepo::update_balance(&conn, &from, from_balance)?;
            let _ = AccountRepo::update_balance(&conn, &to, to_balance)?;
            let _ = PaymentOrderRepo::update_state(&conn, &order, PaymentOrderState::Ok)?;
            info!(
                payment_order_id = order.id,
                ledger_id = entry.id,
                from_account_id = from.id,
                to_account_id = to.id,
                amount = order.amount,
                "money sent"
            );
            Ok(ProcessOutcome::MoneySent)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
