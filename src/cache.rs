//! A sort-keyed cache for repeated sort-injection calls.
//!
//! Callers that page over the same query re-apply the sorting pass with an
//! unchanged sort on every page. The cache keys on `(query, sort)` so the
//! unchanged case returns the memoized string while a changed sort forces a
//! recomputation. Reads are concurrent; only a miss takes the write lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::OqlResult;
use crate::sort::Sort;
use crate::transform::{enhancer_for, Dialect, QueryEnhancer};

#[derive(Debug, Default)]
pub struct SortedQueryCache {
    entries: RwLock<HashMap<(String, Sort), String>>,
    computations: AtomicUsize,
}

impl SortedQueryCache {
    pub fn new() -> Self {
        SortedQueryCache::default()
    }

    /// Apply the sorting pass under `dialect`, memoizing per `(query, sort)`.
    pub fn apply_sorting(
        &self,
        query: &str,
        dialect: Dialect,
        sort: &Sort,
    ) -> OqlResult<String> {
        self.get_or_compute(query, sort, || {
            enhancer_for(query, dialect)?.apply_sorting(sort)
        })
    }

    /// Look up `(query, sort)`, running `compute` only on a miss. A failed
    /// computation is not cached.
    pub fn get_or_compute(
        &self,
        query: &str,
        sort: &Sort,
        compute: impl FnOnce() -> OqlResult<String>,
    ) -> OqlResult<String> {
        let key = (query.to_string(), sort.clone());
        if let Ok(entries) = self.entries.read() {
            if let Some(hit) = entries.get(&key) {
                return Ok(hit.clone());
            }
        }

        self.computations.fetch_add(1, Ordering::Relaxed);
        let value = compute()?;
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, value.clone());
        }
        Ok(value)
    }

    /// How many cache misses have run the computation. Lets tests observe
    /// hits vs. re-parses.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{Order, Sort};

    #[test]
    fn repeated_identical_sort_does_not_recompute() {
        let cache = SortedQueryCache::new();
        let sort = Sort::by([Order::asc("lastname")]);

        let first = cache
            .apply_sorting("select u from User u", Dialect::Strict, &sort)
            .unwrap();
        let second = cache
            .apply_sorting("select u from User u", Dialect::Strict, &sort)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.computations(), 1);
    }

    #[test]
    fn changing_the_sort_forces_recomputation() {
        let cache = SortedQueryCache::new();

        cache
            .apply_sorting(
                "select u from User u",
                Dialect::Strict,
                &Sort::by([Order::asc("lastname")]),
            )
            .unwrap();
        let descending = cache
            .apply_sorting(
                "select u from User u",
                Dialect::Strict,
                &Sort::by([Order::desc("lastname")]),
            )
            .unwrap();

        assert_eq!(descending, "select u from User u order by u.lastname desc");
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn distinct_queries_do_not_collide() {
        let cache = SortedQueryCache::new();
        let sort = Sort::by([Order::asc("name")]);

        let users = cache
            .apply_sorting("select u from User u", Dialect::Strict, &sort)
            .unwrap();
        let roles = cache
            .apply_sorting("select r from Role r", Dialect::Strict, &sort)
            .unwrap();

        assert_ne!(users, roles);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_computations_are_not_cached() {
        let cache = SortedQueryCache::new();
        let sort = Sort::by([Order::asc("name")]);

        assert!(cache
            .apply_sorting("select count( from User", Dialect::Strict, &sort)
            .is_err());
        assert!(cache.is_empty());
    }
}
