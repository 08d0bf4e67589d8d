//! Infrastructure layer: the in-memory counting and snapshot cache.
//!
//! # Modules
//!
//! - [`cache`] - sharded pending-vote accumulator and lock-free snapshot cache

pub mod cache;
