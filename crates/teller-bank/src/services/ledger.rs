//! Read access to settled money movements.

use std::sync::Arc;

use crate::domain::{LedgerTransaction, StatementLine};
use crate::errors::Result;
use crate::repositories::LedgerRepo;
use crate::services::account::find_account;
use crate::{Context, Executor};

/// Answers questions about the ledger.
#[derive(Clone, Debug)]
pub struct LedgerService {
    executor: Arc<Executor>,
}

impl LedgerService {
    /// Create a service running its work on `executor`.
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// Balance of `account_id` recomputed from ledger entries.
    pub fn calculate_balance(&self, ctx: &Context, account_id: i64) -> Result<i64> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            let account = find_account(&conn, account_id)?;
            LedgerRepo::balance(&conn, account.id)
        })
    }

    /// Ledger entries touching `account_id`, oldest first.
    pub fn list_account_transactions(&self, ctx: &Context, account_id: i64) -> Result<Vec<LedgerTransaction>> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            let account = find_account(&conn, account_id)?;
            LedgerRepo::list_for_account(&conn, account.id)
        })
    }

    /// Customer-facing statement for `account_id`.
    pub fn account_statement(&self, ctx: &Context, account_id: i64) -> Result<Vec<StatementLine>> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            let account = find_account(&conn, account_id)?;
            LedgerRepo::statement(&conn, account.id)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
