//! Repository trait for durable per-country totals.

use crate::domain::country::{CountryCode, CountryTotal};
use crate::error::RepositoryError;
use async_trait::async_trait;

/// Durable store holding one row per known country code.
///
/// Totals are monotonically non-decreasing: the reconciler only ever adds
/// positive deltas and never deletes rows.
///
/// # Implementations
///
/// This crate ships no concrete store; callers supply one (a SQL table with
/// `UPDATE ... SET total = total + $1` is the usual shape).
/// - Test mocks available with `cfg(test)`
/// - An in-memory fake lives in `tests/common/mod.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TotalsRepository: Send + Sync {
    /// Reads the complete current set of totals.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] on connectivity or query failure.
    async fn read_all_totals(&self) -> Result<Vec<CountryTotal>, RepositoryError>;

    /// Adds `delta` to the stored total for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if storage has no row for `code`.
    /// Returns [`RepositoryError::Storage`] on any other failure.
    async fn increment_total(&self, code: CountryCode, delta: i32) -> Result<(), RepositoryError>;
}
