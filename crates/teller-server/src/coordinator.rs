//! Background polling of received payment orders.

use std::sync::Arc;
use std::time::Duration;

use teller_bank::Coordinator;
use teller_settings::CoordinatorSettings;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run `coordinator` on a fixed interval until `token` is cancelled.
///
/// Each poll runs on the blocking pool. A poll still running when the next
/// tick fires delays that tick rather than overlapping it.
pub fn spawn_coordinator(
    coordinator: Arc<Coordinator>,
    settings: &CoordinatorSettings,
    token: CancellationToken,
) -> JoinHandle<()> {
    let initial_delay = Duration::from_millis(settings.initial_delay_ms);
    let period = Duration::from_millis(settings.period_ms.max(1));
    let batch_size = settings.batch_size;

    tokio::spawn(async move {
        info!(?initial_delay, ?period, batch_size, "coordinator starting");
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + initial_delay, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let coordinator = Arc::clone(&coordinator);
            match tokio::task::spawn_blocking(move || coordinator.process_pending(batch_size)).await {
                Ok(Ok(report)) if report.polled > 0 => info!(
                    polled = report.polled,
                    sent = report.sent,
                    no_funds = report.no_funds,
                    skipped = report.skipped,
                    failed = report.failed,
                    "payment orders processed"
                ),
                Ok(Ok(_)) => debug!("no payment orders to process"),
                Ok(Err(e)) => warn!(error = %e, "polling payment orders failed"),
                Err(e) => warn!(error = %e, "coordinator poll task failed"),
            }
        }
        info!("coordinator stopped");
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
