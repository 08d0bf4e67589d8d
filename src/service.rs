//! Runtime wiring: cache construction, startup load, worker lifecycle.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::application::reconcile_worker::{ReconcileWorker, spawn_reconcile_worker};
use crate::application::reconciler::Reconciler;
use crate::config::Config;
use crate::domain::repositories::TotalsRepository;
use crate::infrastructure::cache::CountryCache;

/// A running vote-counting core.
///
/// Request handlers get the shared [`CountryCache`] from [`cache`](Self::cache)
/// and call it directly; the durable store is only ever touched by the
/// background reconciler.
pub struct VoteService<R: TotalsRepository + ?Sized + 'static> {
    cache: Arc<CountryCache>,
    reconciler: Arc<Reconciler<R>>,
    worker: ReconcileWorker,
}

impl<R: TotalsRepository + ?Sized + 'static> VoteService<R> {
    /// Starts the core with the given configuration and repository.
    ///
    /// Initializes:
    /// - The cache with one counter shard per configured country code
    /// - The first snapshot, loaded from storage before returning
    /// - The periodic reconcile worker
    ///
    /// # Errors
    ///
    /// Returns an error if the initial load from storage fails.
    pub async fn start(config: &Config, repository: Arc<R>) -> Result<Self> {
        let cache = Arc::new(CountryCache::new(config.country_codes.iter().copied()));
        let reconciler = Arc::new(Reconciler::new(cache.clone(), repository));

        reconciler
            .prime()
            .await
            .context("Failed to load initial country totals")?;

        let worker = spawn_reconcile_worker(
            reconciler.clone(),
            config.reconcile_interval(),
            config.flush_on_shutdown,
        );

        Ok(Self {
            cache,
            reconciler,
            worker,
        })
    }

    pub fn cache(&self) -> Arc<CountryCache> {
        self.cache.clone()
    }

    pub fn reconciler(&self) -> Arc<Reconciler<R>> {
        self.reconciler.clone()
    }

    /// Stops the reconcile worker, letting an in-flight cycle finish.
    pub async fn shutdown(self) {
        self.worker.shutdown().await;
        tracing::info!("Vote service stopped");
    }

    /// Runs until Ctrl-C / SIGTERM, then shuts down gracefully.
    pub async fn run_until_signal(self) {
        shutdown_signal().await;
        self.shutdown().await;
    }
}

/// Resolves when the process receives Ctrl-C or (on Unix) SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
