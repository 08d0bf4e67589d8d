//! Domain layer: country identifiers and the durable-store contract.
//!
//! - [`country`] - `CountryCode`, `CountryTotal`, and the built-in known set
//! - [`repositories`] - `TotalsRepository`, implemented outside this crate
//!
//! The domain layer has no dependency on the cache or the reconciler.

pub mod country;
pub mod repositories;
