//! Repository trait definitions for the domain layer.
//!
//! The durable store is an external collaborator: this module only defines the
//! contract the reconciler consumes. Mock implementations are generated via
//! `mockall` for unit tests.

pub mod totals_repository;

pub use totals_repository::TotalsRepository;

#[cfg(test)]
pub use totals_repository::MockTotalsRepository;
