//! End-to-end behavior of the transaction executor over a real `SQLite` pool.

#![allow(missing_docs, unused_results)]

use std::sync::Arc;

use assert_matches::assert_matches;
use teller_db::{ConnectionConfig, Database, SchemaBootstrapper, ScriptResource};
use teller_tx::{ExecutionContext, NestingPolicy, TransactionExecutor, TxError};

const ITEMS: &[ScriptResource] = &[ScriptResource {
    name: "items.sql",
    content: "CREATE TABLE item (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT NOT NULL);",
}];

#[derive(Debug, thiserror::Error)]
enum WorkError {
    #[error(transparent)]
    Tx(#[from] TxError),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("unit of work failed on purpose")]
    Deliberate,
}

type Executor = TransactionExecutor<Arc<Database>>;
type Ctx = ExecutionContext<teller_db::SqliteConnection>;

fn config(pool_size: u32) -> ConnectionConfig {
    ConnectionConfig {
        pool_size,
        ..ConnectionConfig::default()
    }
}

fn setup_with(dir: &tempfile::TempDir, config: ConnectionConfig, policy: NestingPolicy) -> (Arc<Database>, Executor) {
    let db = Arc::new(Database::new(dir.path().join("tx.db"), config).unwrap());
    db.start().unwrap();
    SchemaBootstrapper::new(Arc::clone(&db), ITEMS, "items.sql", "item")
        .ensure_initialized()
        .unwrap();
    let executor = TransactionExecutor::new(Arc::clone(&db), policy);
    (db, executor)
}

fn setup(dir: &tempfile::TempDir, policy: NestingPolicy) -> (Arc<Database>, Executor) {
    setup_with(dir, config(4), policy)
}

fn insert(ctx: &Ctx, label: &str) -> Result<(), WorkError> {
    ctx.connection()?
        .execute("INSERT INTO item (label) VALUES (?1)", [label])?;
    Ok(())
}

fn count_in(ctx: &Ctx) -> Result<i64, WorkError> {
    Ok(ctx
        .connection()?
        .query_row("SELECT COUNT(*) FROM item", [], |r| r.get(0))?)
}

fn count(executor: &Executor) -> i64 {
    executor.execute(&ExecutionContext::new(), count_in).unwrap()
}

// ── commit / rollback ───────────────────────────────────────────────────────

#[test]
fn failing_unit_of_work_leaves_count_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Reuse);
    let ctx = ExecutionContext::new();
    let before = count(&executor);

    let result: Result<i32, WorkError> = executor.execute(&ctx, |ctx| {
        insert(ctx, "doomed")?;
        Err(WorkError::Deliberate)
    });

    assert_matches!(result, Err(WorkError::Deliberate));
    assert_eq!(count(&executor), before);
}

#[test]
fn successful_unit_of_work_returns_value_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Reuse);
    let ctx = ExecutionContext::new();
    let before = count(&executor);

    let value = executor
        .execute(&ctx, |ctx| {
            insert(ctx, "kept")?;
            Ok::<_, WorkError>(42)
        })
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(count(&executor), before + 1);
}

#[test]
fn committed_data_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let (db, executor) = setup(&dir, NestingPolicy::Reuse);
    executor
        .run(&ExecutionContext::new(), |ctx| insert(ctx, "durable"))
        .unwrap();
    db.stop().unwrap();

    let reopened = Arc::new(Database::new(dir.path().join("tx.db"), config(2)).unwrap());
    reopened.start().unwrap();
    let executor = TransactionExecutor::new(reopened, NestingPolicy::Reuse);

    let label: String = executor
        .execute(&ExecutionContext::new(), |ctx| {
            Ok::<_, WorkError>(ctx.connection()?.query_row("SELECT label FROM item", [], |r| r.get(0))?)
        })
        .unwrap();
    assert_eq!(label, "durable");
}

#[test]
fn sql_error_inside_unit_of_work_rolls_back_earlier_writes() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Reuse);

    let result = executor.run(&ExecutionContext::new(), |ctx| {
        insert(ctx, "first")?;
        ctx.connection()?.execute("INSERT INTO missing_table VALUES (1)", [])?;
        Ok::<_, WorkError>(())
    });

    assert_matches!(result, Err(WorkError::Sqlite(_)));
    assert_eq!(count(&executor), 0);
}

#[test]
fn connection_lookup_outside_unit_of_work_fails() {
    let ctx: Ctx = ExecutionContext::new();
    assert_matches!(ctx.connection(), Err(TxError::NoActiveTransaction));
}

// ── nesting ─────────────────────────────────────────────────────────────────

#[test]
fn strict_nested_call_fails_and_outer_commits() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Strict);

    executor
        .run(&ExecutionContext::new(), |ctx| {
            insert(ctx, "outer")?;
            let nested = executor.run(ctx, |ctx| insert(ctx, "inner"));
            assert_matches!(nested, Err(WorkError::Tx(TxError::NestedTransaction)));
            Ok::<_, WorkError>(())
        })
        .unwrap();

    assert_eq!(count(&executor), 1);
}

#[test]
fn strict_nested_failure_propagated_rolls_back_outer() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Strict);

    let result = executor.run(&ExecutionContext::new(), |ctx| {
        insert(ctx, "outer")?;
        executor.run(ctx, |ctx| insert(ctx, "inner"))
    });

    assert_matches!(result, Err(WorkError::Tx(TxError::NestedTransaction)));
    assert_eq!(count(&executor), 0);
}

#[test]
fn reuse_inner_call_sees_outer_uncommitted_writes() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Reuse);

    let seen = executor
        .execute(&ExecutionContext::new(), |ctx| {
            insert(ctx, "outer")?;
            executor.execute(ctx, count_in)
        })
        .unwrap();

    assert_eq!(seen, 1);
}

#[test]
fn reuse_inner_writes_roll_back_with_outer() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Reuse);

    let result = executor.run(&ExecutionContext::new(), |ctx| {
        executor.run(ctx, |ctx| insert(ctx, "inner"))?;
        assert_eq!(count_in(ctx)?, 1);
        Err::<(), _>(WorkError::Deliberate)
    });

    assert_matches!(result, Err(WorkError::Deliberate));
    assert_eq!(count(&executor), 0);
}

#[test]
fn reuse_inner_writes_commit_with_outer() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Reuse);

    executor
        .run(&ExecutionContext::new(), |ctx| {
            insert(ctx, "outer")?;
            executor.run(ctx, |ctx| insert(ctx, "inner"))
        })
        .unwrap();

    assert_eq!(count(&executor), 2);
}

// ── connection source ───────────────────────────────────────────────────────

#[test]
fn execute_before_start_is_acquisition_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::new(dir.path().join("idle.db"), config(1)).unwrap());
    let executor = TransactionExecutor::new(db, NestingPolicy::Reuse);

    let result = executor.run(&ExecutionContext::new(), |_| Ok::<_, WorkError>(()));

    assert_matches!(result, Err(WorkError::Tx(TxError::ConnectionAcquisition(_))));
}

#[test]
fn exhausted_pool_is_acquisition_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConnectionConfig {
        pool_size: 1,
        connection_timeout_ms: 100,
        ..ConnectionConfig::default()
    };
    let (db, executor) = setup_with(&dir, config, NestingPolicy::Reuse);
    let _held = db.connection().unwrap();

    let result = executor.run(&ExecutionContext::new(), |_| Ok::<_, WorkError>(()));

    assert_matches!(result, Err(WorkError::Tx(TxError::ConnectionAcquisition(_))));
}

#[test]
fn connection_is_returned_to_pool_after_each_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConnectionConfig {
        pool_size: 1,
        connection_timeout_ms: 500,
        ..ConnectionConfig::default()
    };
    let (_db, executor) = setup_with(&dir, config, NestingPolicy::Reuse);
    let ctx = ExecutionContext::new();

    executor.run(&ctx, |ctx| insert(ctx, "a")).unwrap();
    let _ = executor.run(&ctx, |_| Err::<(), _>(WorkError::Deliberate));
    executor.run(&ctx, |ctx| insert(ctx, "b")).unwrap();

    assert_eq!(count(&executor), 2);
}

#[test]
fn transaction_left_open_on_pooled_connection_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let (db, executor) = setup_with(&dir, config(1), NestingPolicy::Reuse);

    {
        let conn = db.connection().unwrap();
        conn.execute_batch("BEGIN; INSERT INTO item (label) VALUES ('stale');")
            .unwrap();
    }

    executor
        .run(&ExecutionContext::new(), |ctx| insert(ctx, "fresh"))
        .unwrap();

    let labels: Vec<String> = executor
        .execute(&ExecutionContext::new(), |ctx| {
            let conn = ctx.connection()?;
            let mut stmt = conn.prepare("SELECT label FROM item ORDER BY id")?;
            let rows = stmt
                .query_map([], |r| r.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok::<_, WorkError>(rows)
        })
        .unwrap();
    assert_eq!(labels, ["fresh"]);
}

#[test]
fn connection_released_inside_unit_of_work_is_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let (db, executor) = setup_with(&dir, config(1), NestingPolicy::Reuse);
    let ctx = ExecutionContext::new();

    let result = executor.run(&ctx, |ctx| {
        insert(ctx, "orphaned")?;
        drop(ctx.clear());
        Ok::<_, WorkError>(())
    });

    assert_matches!(result, Err(WorkError::Tx(TxError::NoActiveTransaction)));
    assert!(!ctx.is_bound());
    let conn = db.connection().unwrap();
    assert!(conn.is_autocommit());
    assert_eq!(
        conn.query_row("SELECT COUNT(*) FROM item", [], |r| r.get::<_, i64>(0))
            .unwrap(),
        0
    );
}

// ── concurrency ─────────────────────────────────────────────────────────────

#[test]
fn concurrent_contexts_each_commit_their_own_work() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Strict);
    let executor = Arc::new(executor);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let executor = Arc::clone(&executor);
            std::thread::spawn(move || {
                let ctx = ExecutionContext::new();
                for i in 0..10 {
                    executor
                        .run(&ctx, |ctx| insert(ctx, &format!("w{worker}-{i}")))
                        .unwrap();
                }
                assert!(!ctx.is_bound());
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(count(&executor), 80);
}

#[test]
fn concurrent_failures_do_not_leak_into_other_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, executor) = setup(&dir, NestingPolicy::Reuse);
    let executor = Arc::new(executor);

    let handles: Vec<_> = (0..6)
        .map(|worker| {
            let executor = Arc::clone(&executor);
            std::thread::spawn(move || {
                let ctx = ExecutionContext::new();
                executor.run(&ctx, |ctx| -> Result<(), WorkError> {
                    insert(ctx, &format!("w{worker}"))?;
                    if worker % 2 == 0 {
                        return Err(WorkError::Deliberate);
                    }
                    Ok(())
                })
            })
        })
        .collect();
    let failures = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Result::is_err)
        .count();

    assert_eq!(failures, 3);
    assert_eq!(count(&executor), 3);
}
