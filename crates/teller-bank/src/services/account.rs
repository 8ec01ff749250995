//! Account management.

use std::sync::Arc;

use rusqlite::Connection;
use tracing::info;

use crate::domain::{Account, AccountType, now};
use crate::errors::{BankError, Result};
use crate::repositories::AccountRepo;
use crate::{Context, Executor};

/// Opens and looks up accounts.
#[derive(Clone, Debug)]
pub struct AccountService {
    executor: Arc<Executor>,
}

impl AccountService {
    /// Create a service running its work on `executor`.
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// Open a customer account with a zero balance.
    pub fn create_personal_account(&self, ctx: &Context, name: &str) -> Result<Account> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            create_account(&conn, AccountType::Personal, name, 0)
        })
    }

    /// Open an internal top-up account holding `balance`.
    pub fn create_top_up_account(&self, ctx: &Context, name: &str, balance: i64) -> Result<Account> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            create_account(&conn, AccountType::TopUp, name, balance)
        })
    }

    /// Open an internal withdrawal account holding `balance`.
    pub fn create_withdrawal_account(&self, ctx: &Context, name: &str, balance: i64) -> Result<Account> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            create_account(&conn, AccountType::Withdrawal, name, balance)
        })
    }

    /// The account with `id`, or [`BankError::AccountNotFound`].
    pub fn find_account(&self, ctx: &Context, id: i64) -> Result<Account> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            find_account(&conn, id)
        })
    }

    /// The top-up account with the lowest balance.
    pub fn find_top_up_account(&self, ctx: &Context) -> Result<Account> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            find_top_up_account(&conn)
        })
    }

    /// The withdrawal account with the highest balance.
    pub fn find_withdrawal_account(&self, ctx: &Context) -> Result<Account> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            find_withdrawal_account(&conn)
        })
    }

    /// Every account, ordered by name.
    pub fn list_accounts(&self, ctx: &Context) -> Result<Vec<Account>> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            AccountRepo::list(&conn)
        })
    }
}

pub(crate) fn create_account(
    conn: &Connection,
    account_type: AccountType,
    name: &str,
    balance: i64,
) -> Result<Account> {
    if name.trim().is_empty() {
        return Err(BankError::InvalidName);
    }
    let account = AccountRepo::create(conn, account_type, name, now(), balance)?;
    info!(account_id = account.id, account_type = %account_type, "account opened");
    Ok(account)
}

pub(crate) fn find_account(conn: &Connection, id: i64) -> Result<Account> {
    AccountRepo::find(conn, id)?.ok_or(BankError::AccountNotFound(id))
}

pub(crate) fn find_top_up_account(conn: &Connection) -> Result<Account> {
    AccountRepo::list_by_type(conn, AccountType::TopUp)?
        .into_iter()
        .min_by_key(|a| a.balance)
        .ok_or(BankError::MissingBankAccount(AccountType::TopUp))
}

pub(crate) fn find_withdrawal_account(conn: &Connection) -> Result<Account> {
    AccountRepo::list_by_type(conn, AccountType::Withdrawal)?
        .into_iter()
        .max_by_key(|a| a.balance)
        .ok_or(BankError::MissingBankAccount(AccountType::Withdrawal))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
