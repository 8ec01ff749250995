//! Feeds received payment orders to the transactor.
//!
//! One poll lists a batch of `RECEIVED` orders and fans them out over a
//! fixed number of scoped worker threads. Each worker owns its own
//! [`Context`], so every order settles in its own transaction on its own
//! connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::Context;
use crate::domain::PaymentOrder;
use crate::errors::Result;
use crate::services::payment_order::PaymentOrderService;
use crate::services::transactor::{ProcessOutcome, Transactor};

/// Tally of one [`Coordinator::process_pending`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Orders picked up by the poll.
    pub polled: usize,
    /// Orders settled with money sent.
    pub sent: usize,
    /// Orders rejected for lack of funds.
    pub no_funds: usize,
    /// Orders left alone (already processed, or transactor stopped).
    pub skipped: usize,
    /// Orders whose processing failed with an error.
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: &Result<ProcessOutcome>) {
        match outcome {
            Ok(ProcessOutcome::MoneySent) => self.sent += 1,
            Ok(ProcessOutcome::NoFunds) => self.no_funds += 1,
            Ok(ProcessOutcome::InvalidState | ProcessOutcome::Stopped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }

    fn merge(&mut self, other: Self) {
        self.sent += other.sent;
        self.no_funds += other.no_funds;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Polls for received orders and settles them in parallel.
#[derive(Debug)]
pub struct Coordinator {
    orders: PaymentOrderService,
    transactor: Arc<Transactor>,
    workers: usize,
}

impl Coordinator {
    /// Create a coordinator settling orders on `workers` threads (at least one).
    pub fn new(orders: PaymentOrderService, transactor: Arc<Transactor>, workers: usize) -> Self {
        Self {
            orders,
            transactor,
            workers: workers.max(1),
        }
    }

    /// Settle up to `batch_size` received orders, oldest first.
    ///
    /// Individual order failures are logged and counted, not returned. Only
    /// a failed poll is an error.
    pub fn process_pending(&self, batch_size: usize) -> Result<BatchReport> {
        let batch = self.orders.list_orders_to_process(&Context::new(), batch_size)?;
        info!(count = batch.len(), "polled payment orders");
        if batch.is_empty() {
            return Ok(BatchReport::default());
        }

        let next = AtomicUsize::new(0);
        let workers = self.workers.min(batch.len());
        let mut report = BatchReport {
            polled: batch.len(),
            ..BatchReport::default()
        };

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| scope.spawn(|| self.work(&batch, &next)))
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(partial) => report.merge(partial),
                    Err(_) => warn!("payment order worker panicked"),
                }
            }
        });

        debug!(?report, "batch finished");
        Ok(report)
    }

    fn work(&self, batch: &[PaymentOrder], next: &AtomicUsize) -> BatchReport {
        let ctx = Context::new();
        let mut report = BatchReport::default();
        while let Some(order) = batch.get(next.fetch_add(1, Ordering::Relaxed)) {
            let outcome = self.transactor.process(&ctx, order);
            if let Err(e) = &outcome {
                warn!(payment_order_id = order.id, error = %e, "payment order processing failed");
            }
            report.record(&outcome);
        }
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
