#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use vote_cache::prelude::*;

/// In-memory stand-in for the durable totals table.
///
/// Holds one row per seeded code. Reads can be made to fail, and individual
/// codes can be made to reject increments.
#[derive(Default)]
pub struct InMemoryTotalsRepository {
    rows: Mutex<BTreeMap<CountryCode, i64>>,
    fail_reads: AtomicBool,
    rejected: Mutex<HashSet<CountryCode>>,
    increments: AtomicUsize,
    reads: AtomicUsize,
}

impl InMemoryTotalsRepository {
    pub fn seeded(rows: &[(&'static str, i64)]) -> Arc<Self> {
        let repo = Self::default();
        {
            let mut table = repo.rows.lock().unwrap();
            for &(code, total) in rows {
                table.insert(CountryCode::from_static(code), total);
            }
        }
        Arc::new(repo)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn reject(&self, code: &'static str) {
        self.rejected
            .lock()
            .unwrap()
            .insert(CountryCode::from_static(code));
    }

    pub fn total(&self, code: &'static str) -> Option<i64> {
        self.rows
            .lock()
            .unwrap()
            .get(&CountryCode::from_static(code))
            .copied()
    }

    pub fn increment_calls(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TotalsRepository for InMemoryTotalsRepository {
    async fn read_all_totals(&self) -> Result<Vec<CountryTotal>, RepositoryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("simulated read failure"));
        }

        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(&code, &total)| CountryTotal::new(code, total))
            .collect())
    }

    async fn increment_total(&self, code: CountryCode, delta: i32) -> Result<(), RepositoryError> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        if self.rejected.lock().unwrap().contains(&code) {
            return Err(RepositoryError::storage("simulated write failure"));
        }

        match self.rows.lock().unwrap().get_mut(&code) {
            Some(total) => {
                *total += i64::from(delta);
                Ok(())
            }
            None => Err(RepositoryError::NotFound(code)),
        }
    }
}

pub fn code(s: &'static str) -> CountryCode {
    CountryCode::from_static(s)
}

pub fn tr_us_cache() -> Arc<CountryCache> {
    Arc::new(CountryCache::new([code("tr"), code("us")]))
}
