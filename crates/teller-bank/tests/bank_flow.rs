//! Bank scenarios over a real `SQLite` file, including composition of
//! service calls under both nesting policies.

#![allow(missing_docs, unused_results)]

use std::sync::Arc;

use assert_matches::assert_matches;
use teller_bank::{
    AccountService, BankError, BankInitializer, Context, Coordinator, Executor, LedgerService,
    PaymentOrderService, PaymentOrderState, PROBE_TABLE, ProcessOutcome, SCHEMA_SCRIPT, SCRIPTS,
    Transactor,
};
use teller_db::{ConnectionConfig, Database, SchemaBootstrapper};
use teller_settings::BankSettings;
use teller_tx::{NestingPolicy, TransactionExecutor, TxError};

struct Bank {
    db: Arc<Database>,
    accounts: AccountService,
    orders: PaymentOrderService,
    ledger: LedgerService,
    transactor: Arc<Transactor>,
    executor: Arc<Executor>,
}

fn open(dir: &tempfile::TempDir, policy: NestingPolicy) -> Bank {
    let db = Arc::new(Database::new(dir.path().join("bank.db"), ConnectionConfig::default()).unwrap());
    db.start().unwrap();
    SchemaBootstrapper::new(Arc::clone(&db), SCRIPTS, SCHEMA_SCRIPT, PROBE_TABLE)
        .ensure_initialized()
        .unwrap();
    let executor = Arc::new(TransactionExecutor::new(Arc::clone(&db), policy));
    BankInitializer::new(Arc::clone(&executor), BankSettings::default())
        .init(&Context::new())
        .unwrap();
    let transactor = Arc::new(Transactor::new(Arc::clone(&executor)));
    transactor.start();
    Bank {
        db,
        accounts: AccountService::new(Arc::clone(&executor)),
        orders: PaymentOrderService::new(Arc::clone(&executor)),
        ledger: LedgerService::new(Arc::clone(&executor)),
        transactor,
        executor,
    }
}

#[test]
fn top_up_pay_and_withdraw() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open(&dir, NestingPolicy::Reuse);
    let ctx = Context::new();
    let amy = bank.accounts.create_personal_account(&ctx, "Amy").unwrap();
    let bob = bank.accounts.create_personal_account(&ctx, "Bob").unwrap();

    bank.orders.top_up_request(&ctx, amy.id, 1_000).unwrap();
    bank.orders.receive_payment_request(&ctx, amy.id, bob.id, 300).unwrap();
    bank.orders.withdrawal_request(&ctx, bob.id, 100).unwrap();

    let coordinator = Coordinator::new(bank.orders.clone(), Arc::clone(&bank.transactor), 1);
    let report = coordinator.process_pending(10).unwrap();
    assert_eq!(report.sent, 3);

    assert_eq!(bank.accounts.find_account(&ctx, amy.id).unwrap().balance, 700);
    assert_eq!(bank.accounts.find_account(&ctx, bob.id).unwrap().balance, 200);
    assert_eq!(bank.ledger.calculate_balance(&ctx, bob.id).unwrap(), 200);

    let statement = bank.ledger.account_statement(&ctx, bob.id).unwrap();
    assert_eq!(statement.len(), 2);
    assert_eq!(statement[1].to_account_name, "<internal withdrawal>");
}

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let amy_id = {
        let bank = open(&dir, NestingPolicy::Reuse);
        let ctx = Context::new();
        let amy = bank.accounts.create_personal_account(&ctx, "Amy").unwrap();
        let order = bank.orders.top_up_request(&ctx, amy.id, 42).unwrap();
        assert_eq!(bank.transactor.process(&ctx, &order).unwrap(), ProcessOutcome::MoneySent);
        bank.db.stop().unwrap();
        amy.id
    };

    let bank = open(&dir, NestingPolicy::Reuse);
    let ctx = Context::new();
    assert_eq!(bank.accounts.find_account(&ctx, amy_id).unwrap().balance, 42);
    // Initializer found the existing internal accounts.
    assert_eq!(bank.accounts.list_accounts(&ctx).unwrap().len(), 3);
}

#[test]
fn composed_calls_join_one_transaction_under_reuse() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open(&dir, NestingPolicy::Reuse);
    let ctx = Context::new();

    let result: Result<(), BankError> = bank.executor.execute(&ctx, |ctx| {
        let amy = bank.accounts.create_personal_account(ctx, "Amy")?;
        bank.orders.top_up_request(ctx, amy.id, 10)?;
        // Fails, so the account and the order above roll back with it.
        bank.orders.top_up_request(ctx, amy.id, 0)?;
        Ok(())
    });

    assert_matches!(result, Err(BankError::InvalidAmount(0)));
    assert_eq!(bank.accounts.list_accounts(&ctx).unwrap().len(), 2);
    assert!(bank.orders.list_orders_to_process(&ctx, 10).unwrap().is_empty());

    let amy = bank
        .executor
        .execute(&ctx, |ctx| {
            let amy = bank.accounts.create_personal_account(ctx, "Amy")?;
            bank.orders.top_up_request(ctx, amy.id, 10)?;
            Ok::<_, BankError>(amy)
        })
        .unwrap();
    assert_eq!(bank.orders.list_orders_for_personal_account(&ctx, amy.id).unwrap().len(), 1);
}

#[test]
fn composed_calls_are_rejected_under_strict() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open(&dir, NestingPolicy::Strict);
    let ctx = Context::new();

    let result = bank
        .executor
        .execute(&ctx, |ctx| bank.accounts.create_personal_account(ctx, "Amy"));

    assert_matches!(result, Err(BankError::Tx(TxError::NestedTransaction)));
    assert!(!ctx.is_bound());

    // Single service calls work normally under the strict policy.
    let amy = bank.accounts.create_personal_account(&ctx, "Amy").unwrap();
    let order = bank.orders.top_up_request(&ctx, amy.id, 5).unwrap();
    assert_eq!(bank.transactor.process(&ctx, &order).unwrap(), ProcessOutcome::MoneySent);
    assert_eq!(
        bank.orders.payment_order_state(&ctx, order.id).unwrap(),
        PaymentOrderState::Ok
    );
}

#[test]
fn racing_workers_settle_each_order_once() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open(&dir, NestingPolicy::Reuse);
    let ctx = Context::new();
    let amy = bank.accounts.create_personal_account(&ctx, "Amy").unwrap();
    let order = bank.orders.top_up_request(&ctx, amy.id, 50).unwrap();

    let outcomes: Vec<ProcessOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| bank.transactor.process(&Context::new(), &order).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| **o == ProcessOutcome::MoneySent).count(), 1);
    assert_eq!(outcomes.iter().filter(|o| **o == ProcessOutcome::InvalidState).count(), 3);
    assert_eq!(bank.accounts.find_account(&ctx, amy.id).unwrap().balance, 50);
    assert_eq!(bank.ledger.list_account_transactions(&ctx, amy.id).unwrap().len(), 1);
}
