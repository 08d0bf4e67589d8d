//! Error types shared by the durable-store boundary.

use crate::domain::country::CountryCode;

pub use crate::domain::country::InvalidCountryCode;

/// Failures reported by a [`crate::domain::repositories::TotalsRepository`].
///
/// Neither variant is fatal: the reconciler logs them and carries on, and the
/// read path keeps serving the last published snapshot.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Storage has no row for the code, so the increment was rejected.
    #[error("country code '{0}' not found in storage")]
    NotFound(CountryCode),

    /// Connectivity or query failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
        }
    }
}
