//! Cache-line sized counter cell.
//!
//! A [`CounterShard`] is one atomic 32-bit counter padded out to a full cache
//! line. Shards for different countries therefore never share a line, and
//! concurrent increments to two countries do not invalidate each other's cache
//! lines on other cores (no false sharing).

use std::mem::size_of;
use std::sync::atomic::{AtomicI32, Ordering};

/// Cache line size on the reference platform (x86-64, most aarch64 cores).
pub const CACHE_LINE_SIZE: usize = 64;

const PADDING: usize = CACHE_LINE_SIZE - size_of::<AtomicI32>();

/// One independently updatable counter occupying exactly one cache line.
///
/// The counter sits at offset 0, followed by 60 inert bytes. `align(64)` puts
/// every shard on a line boundary, so the layout holds whether shards live in
/// separate allocations or side by side in a slice.
///
/// ```
/// use vote_cache::infrastructure::cache::CounterShard;
///
/// let shard = CounterShard::new();
/// shard.increment();
/// shard.increment();
/// assert_eq!(shard.drain_and_reset(), 2);
/// assert_eq!(shard.drain_and_reset(), 0);
/// ```
#[repr(C, align(64))]
pub struct CounterShard {
    value: AtomicI32,
    _padding: [u8; PADDING],
}

const _: () = assert!(size_of::<CounterShard>() == CACHE_LINE_SIZE);

impl CounterShard {
    pub const fn new() -> Self {
        Self {
            value: AtomicI32::new(0),
            _padding: [0; PADDING],
        }
    }

    /// Atomically adds one. Never fails; wraps on overflow.
    #[inline]
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Atomically reads the counter and resets it to zero in one step.
    ///
    /// Every increment lands in exactly one drain: the swap is a single
    /// read-modify-write, so an increment is ordered either before it (and
    /// returned here) or after it (and left for the next drain).
    #[inline]
    pub fn drain_and_reset(&self) -> i32 {
        self.value.swap(0, Ordering::AcqRel)
    }

    /// Reads the counter without resetting it.
    ///
    /// The value may already be stale when the caller looks at it; use it only
    /// as a "has pending work" hint.
    #[inline]
    pub fn peek(&self) -> i32 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for CounterShard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CounterShard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterShard")
            .field("value", &self.peek())
            .finish()
    }
}
