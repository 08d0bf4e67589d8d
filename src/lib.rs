//! # Vote Cache
//!
//! Write-behind counting core for high-rate per-country votes.
//!
//! Every vote is an atomic increment on a cache-line padded counter; durable
//! storage only sees one batched `increment_total` per country every few
//! seconds. Reads are served from an immutable snapshot that is swapped in
//! wholesale after each reconciliation.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - Country codes and the `TotalsRepository` trait
//! - **Infrastructure Layer** ([`infrastructure`]) - Sharded accumulator and snapshot cache
//! - **Application Layer** ([`application`]) - Reconciler cycle and periodic worker
//! - **Service** ([`service`]) - Startup, shutdown and signal handling
//!
//! ## Data Flow
//!
//! ```text
//! vote  ──► CountryCache::record_vote ──► CounterShard::increment   (no lock, no I/O)
//! read  ──► CountryCache::get_snapshot ──► Arc<CountrySnapshot>     (wait-free)
//! timer ──► Reconciler::run_cycle
//!             drain ──► increment_total × N ──► read_all_totals ──► publish_snapshot
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let config = vote_cache::config::load()?;
//! vote_cache::telemetry::init_tracing(&config)?;
//! config.print_summary();
//!
//! let service = VoteService::start(&config, Arc::new(MyRepository::new(pool))).await?;
//! let cache = service.cache();   // hand this to request handlers
//!
//! service.run_until_signal().await;
//! ```
//!
//! ## Configuration
//!
//! Loaded from environment variables via [`config::Config`]. See [`config`]
//! for available options.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod telemetry;

pub use error::RepositoryError;
pub use service::VoteService;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::{CycleOutcome, ReconcilePhase, Reconciler};
    pub use crate::domain::country::{CountryCode, CountryTotal, KNOWN_COUNTRY_CODES};
    pub use crate::domain::repositories::TotalsRepository;
    pub use crate::error::RepositoryError;
    pub use crate::infrastructure::cache::{CountryCache, CountrySnapshot};
    pub use crate::service::VoteService;
}
