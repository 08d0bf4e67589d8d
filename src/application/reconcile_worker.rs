//! Periodic trigger for the reconciler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::application::reconciler::Reconciler;
use crate::domain::repositories::TotalsRepository;

/// Handle to a running reconcile worker.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) closes the
/// shutdown channel, which also stops the worker after its current cycle.
pub struct ReconcileWorker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReconcileWorker {
    /// Disarms the timer and waits for the worker to exit.
    ///
    /// A cycle already in flight runs to completion; it is never interrupted
    /// mid-persist. With `flush_on_shutdown` the worker then runs one final
    /// cycle so votes recorded since the last tick reach storage.
    pub async fn shutdown(self) {
        tracing::info!("Stopping reconcile worker...");
        let _ = self.shutdown_tx.send(true);

        if let Err(e) = self.handle.await {
            tracing::error!("Reconcile worker terminated abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns a task that runs [`Reconciler::run_cycle`] every `interval`.
///
/// The first tick fires one full `interval` after spawning (the startup cycle
/// is [`Reconciler::prime`], run by the caller). Cycles run inline in the
/// worker loop, so at most one is ever in flight; ticks that come due while a
/// slow cycle is still running are skipped rather than queued.
pub fn spawn_reconcile_worker<R>(
    reconciler: Arc<Reconciler<R>>,
    interval: Duration,
    flush_on_shutdown: bool,
) -> ReconcileWorker
where
    R: TotalsRepository + ?Sized + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_reconcile_worker(
        reconciler,
        interval,
        flush_on_shutdown,
        shutdown_rx,
    ));

    tracing::info!(
        interval_secs = interval.as_secs_f64(),
        "Reconcile worker started"
    );

    ReconcileWorker {
        shutdown_tx,
        handle,
    }
}

async fn run_reconcile_worker<R>(
    reconciler: Arc<Reconciler<R>>,
    interval: Duration,
    flush_on_shutdown: bool,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    R: TotalsRepository + ?Sized,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            // Err means every sender is gone; treat it like a shutdown request.
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {
                reconciler.run_cycle().await;
            }
        }
    }

    if flush_on_shutdown {
        tracing::info!("Flushing pending votes before shutdown");
        reconciler.run_cycle().await;
    }

    tracing::info!("Reconcile worker stopped");
}
