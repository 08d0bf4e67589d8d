//! Write-behind reconciliation between the in-memory cache and durable storage.
//!
//! One cycle walks `Idle → Draining → Persisting → Reloading → Publishing → Idle`:
//!
//! 1. **Draining** - take every pending count out of the accumulator. If nothing
//!    is pending the cycle ends here without touching storage.
//! 2. **Persisting** - one `increment_total(code, count)` per drained code. A
//!    failing code is logged and skipped; its votes are lost.
//! 3. **Reloading** - read every total back from storage.
//! 4. **Publishing** - build a fresh snapshot and swap it into the cache.
//!
//! If reloading fails the old snapshot stays live. Increments already applied
//! in step 2 are durable and are not retried.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use tokio::sync::Mutex;

use crate::domain::country::CountryCode;
use crate::domain::repositories::TotalsRepository;
use crate::error::RepositoryError;
use crate::infrastructure::cache::{CountryCache, CountrySnapshot};

/// Where the reconciler currently is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReconcilePhase {
    Idle = 0,
    Draining = 1,
    Persisting = 2,
    Reloading = 3,
    Publishing = 4,
}

impl ReconcilePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Draining,
            2 => Self::Persisting,
            3 => Self::Reloading,
            4 => Self::Publishing,
            _ => Self::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Draining => "draining",
            Self::Persisting => "persisting",
            Self::Reloading => "reloading",
            Self::Publishing => "publishing",
        }
    }
}

/// An increment storage rejected. Its votes are not retried.
#[derive(Debug)]
pub struct FailedIncrement {
    pub code: CountryCode,
    pub delta: i32,
    pub error: RepositoryError,
}

/// Result of the Persisting step.
#[derive(Debug, Default)]
pub struct PersistSummary {
    /// Codes whose increment storage accepted.
    pub persisted: usize,
    /// Votes carried by the accepted increments.
    pub votes_persisted: i64,
    pub failed: Vec<FailedIncrement>,
}

impl PersistSummary {
    /// Votes drained this cycle that never reached storage.
    pub fn lost_votes(&self) -> i64 {
        self.failed.iter().map(|f| i64::from(f.delta)).sum()
    }
}

/// What a single reconciliation cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing was pending; storage was not touched.
    NothingPending,
    /// Deltas were persisted and a reloaded snapshot published.
    Published {
        persist: PersistSummary,
        countries: usize,
    },
    /// Deltas were persisted but the reload failed; the old snapshot stays live.
    ReloadFailed {
        persist: PersistSummary,
        error: RepositoryError,
    },
}

impl CycleOutcome {
    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NothingPending => "nothing_pending",
            Self::Published { .. } => "published",
            Self::ReloadFailed { .. } => "reload_failed",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }

    pub fn persist_summary(&self) -> Option<&PersistSummary> {
        match self {
            Self::NothingPending => None,
            Self::Published { persist, .. } | Self::ReloadFailed { persist, .. } => Some(persist),
        }
    }
}

/// Drains the cache into durable storage and publishes reloaded snapshots.
///
/// Cycles never overlap: each one holds an internal async lock, so a manual
/// [`run_cycle`](Self::run_cycle) queues behind a timer-driven one instead of
/// draining concurrently.
pub struct Reconciler<R: TotalsRepository + ?Sized> {
    cache: Arc<CountryCache>,
    repository: Arc<R>,
    phase: AtomicU8,
    cycle_lock: Mutex<()>,
}

impl<R: TotalsRepository + ?Sized> Reconciler<R> {
    pub fn new(cache: Arc<CountryCache>, repository: Arc<R>) -> Self {
        Self {
            cache,
            repository,
            phase: AtomicU8::new(ReconcilePhase::Idle as u8),
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &Arc<CountryCache> {
        &self.cache
    }

    /// Current phase, for health reporting.
    pub fn phase(&self) -> ReconcilePhase {
        ReconcilePhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn enter(&self, phase: ReconcilePhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Runs one periodic reconciliation cycle.
    ///
    /// Never fails: storage errors are logged and reported in the outcome.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _guard = self.cycle_lock.lock().await;
        let started = Instant::now();

        let outcome = self.cycle().await;
        self.enter(ReconcilePhase::Idle);

        record_outcome(&outcome);
        match &outcome {
            CycleOutcome::NothingPending => {
                tracing::debug!("No pending votes to reconcile");
            }
            CycleOutcome::Published { persist, countries } => {
                tracing::info!(
                    persisted = persist.persisted,
                    votes = persist.votes_persisted,
                    failed = persist.failed.len(),
                    countries,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Reconciled pending votes and refreshed snapshot"
                );
            }
            CycleOutcome::ReloadFailed { persist, error } => {
                tracing::error!(
                    persisted = persist.persisted,
                    votes = persist.votes_persisted,
                    failed = persist.failed.len(),
                    error = %error,
                    "Failed to reload totals, keeping previous snapshot"
                );
            }
        }

        outcome
    }

    /// Startup cycle: persists anything already pending, then reloads and
    /// publishes unconditionally.
    ///
    /// Returns the number of countries in the published snapshot.
    ///
    /// # Errors
    ///
    /// Returns the reload error so startup can refuse to serve without data.
    pub async fn prime(&self) -> Result<usize, RepositoryError> {
        let _guard = self.cycle_lock.lock().await;

        self.enter(ReconcilePhase::Draining);
        let drained = self.cache.drain_pending();
        if !drained.is_empty() {
            self.enter(ReconcilePhase::Persisting);
            self.persist(drained).await;
        }

        let result = self.reload_and_publish().await;
        self.enter(ReconcilePhase::Idle);

        match &result {
            Ok(countries) => tracing::info!("Loaded {} country totals into cache", countries),
            Err(e) => tracing::error!("Failed to load initial country totals: {}", e),
        }

        result
    }

    async fn cycle(&self) -> CycleOutcome {
        self.enter(ReconcilePhase::Draining);
        let drained = self.cache.drain_pending();
        if drained.is_empty() {
            return CycleOutcome::NothingPending;
        }

        tracing::debug!("Processing {} pending country updates", drained.len());
        self.enter(ReconcilePhase::Persisting);
        let persist = self.persist(drained).await;

        match self.reload_and_publish().await {
            Ok(countries) => CycleOutcome::Published { persist, countries },
            Err(error) => CycleOutcome::ReloadFailed { persist, error },
        }
    }

    async fn persist(&self, drained: BTreeMap<CountryCode, i32>) -> PersistSummary {
        let mut summary = PersistSummary::default();

        for (code, delta) in drained {
            match self.repository.increment_total(code, delta).await {
                Ok(()) => {
                    summary.persisted += 1;
                    summary.votes_persisted += i64::from(delta);
                }
                Err(error) => {
                    tracing::warn!(
                        country = %code,
                        delta,
                        error = %error,
                        "Failed to persist votes, dropping them"
                    );
                    metrics::counter!("reconcile_increment_failures_total", "kind" => error.kind())
                        .increment(1);
                    summary.failed.push(FailedIncrement { code, delta, error });
                }
            }
        }

        summary
    }

    async fn reload_and_publish(&self) -> Result<usize, RepositoryError> {
        self.enter(ReconcilePhase::Reloading);
        let totals = self.repository.read_all_totals().await?;

        self.enter(ReconcilePhase::Publishing);
        let snapshot = CountrySnapshot::from_totals(totals);
        let countries = snapshot.len();
        self.cache.publish_snapshot(snapshot);

        Ok(countries)
    }
}

fn record_outcome(outcome: &CycleOutcome) {
    metrics::counter!("reconcile_cycles_total", "outcome" => outcome.label()).increment(1);

    if let Some(persist) = outcome.persist_summary() {
        metrics::counter!("reconcile_votes_persisted_total")
            .increment(persist.votes_persisted.max(0) as u64);
        metrics::counter!("reconcile_lost_votes_total").increment(persist.lost_votes().max(0) as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::country::CountryTotal;
    use crate::domain::repositories::MockTotalsRepository;
    use mockall::Sequence;

    fn code(s: &'static str) -> CountryCode {
        CountryCode::from_static(s)
    }

    fn tr_us_cache() -> Arc<CountryCache> {
        Arc::new(CountryCache::new([code("tr"), code("us")]))
    }

    fn totals(rows: &[(&'static str, i64)]) -> Vec<CountryTotal> {
        rows.iter()
            .map(|&(c, total)| CountryTotal::new(code(c), total))
            .collect()
    }

    #[tokio::test]
    async fn test_nothing_pending_skips_storage() {
        // A mock without expectations panics on any call.
        let mock_repo = MockTotalsRepository::new();
        let cache = tr_us_cache();
        let before = cache.get_snapshot();

        let reconciler = Reconciler::new(cache.clone(), Arc::new(mock_repo));
        let outcome = reconciler.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::NothingPending));
        assert!(Arc::ptr_eq(&before, &cache.get_snapshot()));
        assert_eq!(reconciler.phase(), ReconcilePhase::Idle);
    }

    #[tokio::test]
    async fn test_publishes_reloaded_totals_not_local_sums() {
        let mut mock_repo = MockTotalsRepository::new();
        let mut seq = Sequence::new();

        mock_repo
            .expect_increment_total()
            .withf(|c, delta| *c == CountryCode::from_static("tr") && *delta == 5)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mock_repo
            .expect_read_all_totals()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(totals(&[("tr", 100), ("us", 200)])));

        let cache = tr_us_cache();
        for _ in 0..5 {
            cache.record_vote("tr");
        }

        let reconciler = Reconciler::new(cache.clone(), Arc::new(mock_repo));
        let outcome = reconciler.run_cycle().await;

        match outcome {
            CycleOutcome::Published { persist, countries } => {
                assert_eq!(persist.persisted, 1);
                assert_eq!(persist.votes_persisted, 5);
                assert!(persist.failed.is_empty());
                assert_eq!(countries, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(cache.get_total("tr"), Some(100));
        assert_eq!(cache.get_total("us"), Some(200));
        assert!(!cache.has_pending());
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_previous_snapshot() {
        let mut mock_repo = MockTotalsRepository::new();
        mock_repo
            .expect_increment_total()
            .times(1)
            .returning(|_, _| Ok(()));
        mock_repo
            .expect_read_all_totals()
            .times(1)
            .returning(|| Err(RepositoryError::storage("connection reset")));

        let cache = tr_us_cache();
        cache.publish_snapshot(CountrySnapshot::from_totals(totals(&[("tr", 42)])));
        let before = cache.get_snapshot();
        cache.record_vote("us");

        let reconciler = Reconciler::new(cache.clone(), Arc::new(mock_repo));
        let outcome = reconciler.run_cycle().await;

        match outcome {
            CycleOutcome::ReloadFailed { persist, error } => {
                assert_eq!(persist.persisted, 1);
                assert!(matches!(error, RepositoryError::Storage(_)));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert!(Arc::ptr_eq(&before, &cache.get_snapshot()));
        assert_eq!(cache.get_total("tr"), Some(42));
        // persisted deltas are not re-queued
        assert!(!cache.has_pending());
        assert_eq!(reconciler.phase(), ReconcilePhase::Idle);
    }

    #[tokio::test]
    async fn test_partial_persist_failure_continues() {
        let mut mock_repo = MockTotalsRepository::new();
        mock_repo
            .expect_increment_total()
            .withf(|c, _| *c == CountryCode::from_static("tr"))
            .times(1)
            .returning(|c, _| Err(RepositoryError::NotFound(c)));
        mock_repo
            .expect_increment_total()
            .withf(|c, delta| *c == CountryCode::from_static("us") && *delta == 2)
            .times(1)
            .returning(|_, _| Ok(()));
        mock_repo
            .expect_read_all_totals()
            .times(1)
            .returning(|| Ok(totals(&[("us", 2)])));

        let cache = tr_us_cache();
        for _ in 0..3 {
            cache.record_vote("tr");
        }
        cache.record_vote("us");
        cache.record_vote("us");

        let reconciler = Reconciler::new(cache.clone(), Arc::new(mock_repo));
        let outcome = reconciler.run_cycle().await;

        let persist = outcome.persist_summary().unwrap();
        assert!(outcome.is_published());
        assert_eq!(persist.persisted, 1);
        assert_eq!(persist.failed.len(), 1);
        assert_eq!(persist.failed[0].code, code("tr"));
        assert_eq!(persist.lost_votes(), 3);
        assert_eq!(cache.get_total("us"), Some(2));
        assert_eq!(cache.get_total("tr"), None);
    }

    #[tokio::test]
    async fn test_prime_reloads_without_pending_votes() {
        let mut mock_repo = MockTotalsRepository::new();
        mock_repo.expect_increment_total().never();
        mock_repo
            .expect_read_all_totals()
            .times(1)
            .returning(|| Ok(totals(&[("tr", 7), ("us", 9)])));

        let cache = tr_us_cache();
        let reconciler = Reconciler::new(cache.clone(), Arc::new(mock_repo));

        assert_eq!(reconciler.prime().await.unwrap(), 2);
        assert_eq!(cache.get_total("tr"), Some(7));
        assert!(cache.get_snapshot().refreshed_at().is_some());
    }

    #[tokio::test]
    async fn test_prime_reports_reload_failure() {
        let mut mock_repo = MockTotalsRepository::new();
        mock_repo
            .expect_read_all_totals()
            .times(1)
            .returning(|| Err(RepositoryError::storage("database is locked")));

        let cache = tr_us_cache();
        let reconciler = Reconciler::new(cache.clone(), Arc::new(mock_repo));

        assert!(reconciler.prime().await.is_err());
        assert!(cache.get_snapshot().is_empty());
        assert_eq!(reconciler.phase(), ReconcilePhase::Idle);
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(ReconcilePhase::from_u8(3), ReconcilePhase::Reloading);
        assert_eq!(ReconcilePhase::from_u8(42), ReconcilePhase::Idle);
        assert_eq!(ReconcilePhase::Publishing.as_str(), "publishing");
    }
}
