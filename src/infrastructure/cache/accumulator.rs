//! Write-optimized pending vote accumulator.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::country::CountryCode;

use super::shard::CounterShard;

/// Pending increments keyed by country, one [`CounterShard`] per known code.
///
/// All shards are allocated up front in [`PendingUpdateAccumulator::new`] and
/// the code → shard mapping never changes afterwards, so recording a vote is a
/// hash lookup plus one atomic add: no lock, no allocation, no I/O.
///
/// Values are unordered and must be drained (not just read) to be consumed.
pub struct PendingUpdateAccumulator {
    shards: Box<[CounterShard]>,
    index: HashMap<CountryCode, usize>,
    unknown_votes: AtomicU64,
}

impl PendingUpdateAccumulator {
    /// Creates an accumulator for a closed set of codes. Duplicates share a shard.
    pub fn new(codes: impl IntoIterator<Item = CountryCode>) -> Self {
        let mut index = HashMap::new();
        for code in codes {
            let next = index.len();
            index.entry(code).or_insert(next);
        }

        let shards = (0..index.len()).map(|_| CounterShard::new()).collect();

        Self {
            shards,
            index,
            unknown_votes: AtomicU64::new(0),
        }
    }

    /// Records one vote for `code`.
    ///
    /// Codes outside the known set (or malformed ones) are dropped silently.
    /// Callers validate codes before getting here; the drop is only a safety
    /// net, counted in [`unknown_votes`](Self::unknown_votes).
    #[inline]
    pub fn record_vote(&self, code: &str) {
        match self.shard_for(code) {
            Some(shard) => shard.increment(),
            None => {
                self.unknown_votes.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("votes_unknown_country_total").increment(1);
            }
        }
    }

    #[inline]
    fn shard_for(&self, code: &str) -> Option<&CounterShard> {
        let code = CountryCode::parse(code).ok()?;
        self.index.get(&code).map(|&i| &self.shards[i])
    }

    /// Drains every shard and returns the non-zero counts.
    ///
    /// Safe to run alongside any number of [`record_vote`](Self::record_vote)
    /// calls: a concurrent vote is attributed to this drain or the next, never
    /// both and never neither. Drains themselves are expected to be serialized
    /// by the caller.
    pub fn drain_all(&self) -> BTreeMap<CountryCode, i32> {
        let mut drained = BTreeMap::new();

        for (&code, &i) in &self.index {
            let count = self.shards[i].drain_and_reset();
            if count > 0 {
                drained.insert(code, count);
            } else if count < 0 {
                // Only reachable after 2^31 votes in one interval.
                tracing::error!(
                    country = %code,
                    count,
                    "Pending counter overflowed, dropping drained value"
                );
            }
        }

        drained
    }

    /// Returns `true` if any shard currently holds pending votes. Advisory only.
    pub fn has_any(&self) -> bool {
        self.shards.iter().any(|shard| shard.peek() != 0)
    }

    /// Returns `true` if `code` is part of the known set.
    pub fn is_known(&self, code: &str) -> bool {
        self.shard_for(code).is_some()
    }

    /// Iterates over the known codes in no particular order.
    pub fn known_codes(&self) -> impl Iterator<Item = CountryCode> + '_ {
        self.index.keys().copied()
    }

    /// Number of known codes (and shards).
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Total votes dropped because their code was not in the known set.
    pub fn unknown_votes(&self) -> u64 {
        self.unknown_votes.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PendingUpdateAccumulator {
    /// Formats the accumulator showing only non-zero shards.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pending: Vec<_> = self
            .index
            .iter()
            .map(|(code, &i)| (*code, self.shards[i].peek()))
            .filter(|(_, value)| *value != 0)
            .collect();
        pending.sort();

        f.debug_struct("PendingUpdateAccumulator")
            .field("codes", &self.len())
            .field("pending", &pending)
            .field("unknown_votes", &self.unknown_votes())
            .finish()
    }
}
