//! Immutable point-in-time view of per-country totals.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::country::{CountryCode, CountryTotal};

/// Read-optimized mapping of country code → aggregated total.
///
/// A snapshot is never mutated after construction. The cache replaces it
/// wholesale, so readers holding an `Arc<CountrySnapshot>` keep a consistent
/// view for as long as they need it.
///
/// Serializes as a plain JSON object, e.g. `{"tr": 100, "us": 200}`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct CountrySnapshot {
    totals: HashMap<CountryCode, i64>,
    #[serde(skip)]
    refreshed_at: Option<DateTime<Utc>>,
}

impl CountrySnapshot {
    /// The cold-start snapshot: no totals, never refreshed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from rows reported by storage, stamped with the current time.
    ///
    /// If a code appears more than once, the last row wins.
    pub fn from_totals(totals: impl IntoIterator<Item = CountryTotal>) -> Self {
        Self {
            totals: totals
                .into_iter()
                .map(|row| (row.code, row.total))
                .collect(),
            refreshed_at: Some(Utc::now()),
        }
    }

    /// Looks up the total for `code`. Returns `None` for malformed or absent codes.
    pub fn get(&self, code: &str) -> Option<i64> {
        let code = CountryCode::parse(code).ok()?;
        self.totals.get(&code).copied()
    }

    pub fn get_code(&self, code: CountryCode) -> Option<i64> {
        self.totals.get(&code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = CountryTotal> + '_ {
        self.totals
            .iter()
            .map(|(&code, &total)| CountryTotal::new(code, total))
    }

    /// Sum of all totals.
    pub fn grand_total(&self) -> i64 {
        self.totals.values().sum()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// When the data was loaded from storage; `None` before the first load.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Copies the totals out as string-keyed pairs, sorted by code.
    pub fn to_sorted_vec(&self) -> Vec<(String, i64)> {
        let mut rows: Vec<_> = self
            .totals
            .iter()
            .map(|(code, &total)| (code.to_string(), total))
            .collect();
        rows.sort();
        rows
    }
}
