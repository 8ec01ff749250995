//! Creates the bank's own accounts on first start.

use std::sync::Arc;

use teller_settings::BankSettings;
use tracing::info;

use crate::domain::AccountType;
use crate::errors::{BankError, Result};
use crate::services::account::{create_account, find_top_up_account, find_withdrawal_account};
use crate::{Context, Executor};

/// Ensures one top-up and one withdrawal account exist.
#[derive(Debug)]
pub struct BankInitializer {
    executor: Arc<Executor>,
    settings: BankSettings,
}

impl BankInitializer {
    /// Create an initializer opening accounts as described by `settings`.
    pub fn new(executor: Arc<Executor>, settings: BankSettings) -> Self {
        Self { executor, settings }
    }

    /// Open whichever internal accounts are missing, in one transaction.
    ///
    /// Returns the number of accounts opened.
    pub fn init(&self, ctx: &Context) -> Result<usize> {
        self.executor.execute(ctx, |ctx| {
            let conn = ctx.connection()?;
            let mut opened = 0;

            match find_top_up_account(&conn) {
                Ok(_) => {}
                Err(BankError::MissingBankAccount(_)) => {
                    info!("initializing top-up account");
                    let _ = create_account(
                        &conn,
                        AccountType::TopUp,
                        &self.settings.top_up_account_name,
                        self.settings.top_up_balance,
                    )?;
                    opened += 1;
                }
                Err(e) => return Err(e),
            }

            match find_withdrawal_account(&conn) {
                Ok(_) => {}
                Err(BankError::MissingBankAccount(_)) => {
                    info!("initializing withdrawal account");
                    let _ = create_account(
                        &conn,
                        AccountType::Withdrawal,
                        &self.settings.withdrawal_account_name,
                        self.settings.withdrawal_balance,
                    )?;
                    opened += 1;
                }
                Err(e) => return Err(e),
            }

            Ok(opened)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::test_support::TestBank;

    #[test]
    fn opens_both_accounts_once() {
        let bank = TestBank::new();
        let ctx = Context::new();
        let init = BankInitializer::new(bank.executor.clone(), BankSettings::default());

        assert_eq!(init.init(&ctx).unwrap(), 2);
        assert_eq!(init.init(&ctx).unwrap(), 0);

        let top_up = bank.accounts.find_top_up_account(&ctx).unwrap();
        assert_eq!(top_up.name, "Bank top-up account");
        assert_eq!(top_up.balance, 99_999_900);
        let withdrawal = bank.accounts.find_withdrawal_account(&ctx).unwrap();
        assert_eq!(withdrawal.name, "Bank withdrawal account");
        assert_eq!(bank.accounts.list_accounts(&ctx).unwrap().len(), 2);
    }

    #[test]
    fn opens_only_missing_account() {
        let bank = TestBank::new();
        let ctx = Context::new();
        bank.accounts.create_top_up_account(&ctx, "existing", 1).unwrap();
        let settings = BankSettings {
            withdrawal_account_name: "Sink".into(),
            withdrawal_balance: 7,
            ..BankSettings::default()
        };

        assert_eq!(BankInitializer::new(bank.executor.clone(), settings).init(&ctx).unwrap(), 1);
        assert_eq!(bank.accounts.find_top_up_account(&ctx).unwrap().name, "existing");
        let withdrawal = bank.accounts.find_withdrawal_account(&ctx).unwrap();
        assert_eq!((withdrawal.name.as_str(), withdrawal.balance), ("Sink", 7));
    }
}
