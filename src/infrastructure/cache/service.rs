//! Unified read/write cache consumed by request handlers.

use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::country::{CountryCode, KNOWN_COUNTRY_CODES};

use super::accumulator::PendingUpdateAccumulator;
use super::snapshot::CountrySnapshot;

/// Write-behind vote cache.
///
/// Composes two halves with opposite trade-offs:
///
/// - **Writes** go to a [`PendingUpdateAccumulator`]: one padded atomic counter
///   per known country, so [`record_vote`](Self::record_vote) never locks,
///   allocates, or touches storage.
/// - **Reads** go to the currently published [`CountrySnapshot`], held in an
///   [`ArcSwap`]. [`get_snapshot`](Self::get_snapshot) is a wait-free pointer
///   load; [`publish_snapshot`](Self::publish_snapshot) swaps in a fully built
///   replacement, so no reader ever sees a half-built mapping.
///
/// Votes become visible to readers only after the reconciler has persisted
/// them and published a reloaded snapshot.
///
/// # Examples
///
/// ```
/// use vote_cache::domain::country::{CountryCode, CountryTotal};
/// use vote_cache::infrastructure::cache::{CountryCache, CountrySnapshot};
///
/// let cache = CountryCache::new([CountryCode::from_static("tr")]);
/// cache.record_vote("tr");
/// assert!(cache.has_pending());
/// assert_eq!(cache.get_total("tr"), None);
///
/// let tr = CountryCode::from_static("tr");
/// cache.publish_snapshot(CountrySnapshot::from_totals([CountryTotal::new(tr, 1)]));
/// assert_eq!(cache.get_total("tr"), Some(1));
/// ```
pub struct CountryCache {
    snapshot: ArcSwap<CountrySnapshot>,
    pending: PendingUpdateAccumulator,
}

impl CountryCache {
    /// Creates a cache for a closed set of codes with an empty snapshot.
    pub fn new(codes: impl IntoIterator<Item = CountryCode>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(CountrySnapshot::empty()),
            pending: PendingUpdateAccumulator::new(codes),
        }
    }

    /// Creates a cache for the built-in set of 195 country codes.
    pub fn with_known_countries() -> Self {
        Self::new(KNOWN_COUNTRY_CODES)
    }

    /// Returns the currently published snapshot. Never blocks, never fails.
    pub fn get_snapshot(&self) -> Arc<CountrySnapshot> {
        self.snapshot.load_full()
    }

    /// Looks up one total in the current snapshot.
    ///
    /// Returns `None` if the code is absent, e.g. before the first load.
    pub fn get_total(&self, code: &str) -> Option<i64> {
        self.snapshot.load().get(code)
    }

    /// Atomically replaces the published snapshot.
    ///
    /// Readers already holding the previous `Arc` keep it until they drop it.
    pub fn publish_snapshot(&self, snapshot: CountrySnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    /// Records one vote. Unknown codes are dropped silently.
    #[inline]
    pub fn record_vote(&self, code: &str) {
        self.pending.record_vote(code);
    }

    /// Drains all pending votes, returning the non-zero counts.
    pub fn drain_pending(&self) -> BTreeMap<CountryCode, i32> {
        self.pending.drain_all()
    }

    /// Advisory "votes waiting for reconciliation" flag for health checks.
    pub fn has_pending(&self) -> bool {
        self.pending.has_any()
    }

    /// Returns `true` if `code` is in the closed known set.
    ///
    /// Request handlers use this to reject codes before calling
    /// [`record_vote`](Self::record_vote).
    pub fn is_known(&self, code: &str) -> bool {
        self.pending.is_known(code)
    }

    /// Number of votes dropped for unknown codes since startup.
    pub fn unknown_votes(&self) -> u64 {
        self.pending.unknown_votes()
    }

    pub fn known_codes(&self) -> impl Iterator<Item = CountryCode> + '_ {
        self.pending.known_codes()
    }
}

impl Default for CountryCache {
    fn default() -> Self {
        Self::with_known_countries()
    }
}

impl std::fmt::Debug for CountryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountryCache")
            .field("snapshot_len", &self.snapshot.load().len())
            .field("pending", &self.pending)
            .finish()
    }
}
