//! In-memory counting and caching layer.
//!
//! - [`CounterShard`] - one cache-line padded atomic counter
//! - [`PendingUpdateAccumulator`] - write-optimized per-country pending votes
//! - [`CountrySnapshot`] - read-optimized immutable totals
//! - [`CountryCache`] - the two combined behind one read/write contract

mod accumulator;
mod service;
mod shard;
mod snapshot;

pub use accumulator::PendingUpdateAccumulator;
pub use service::CountryCache;
pub use shard::{CACHE_LINE_SIZE, CounterShard};
pub use snapshot::CountrySnapshot;
