//! Bounded cache of search results by normalized query.
//!
//! Entries expire after a TTL. When full, the entry inserted first is
//! evicted, regardless of how often it was read.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use apple_nation_core::ProductSummary;

#[derive(Debug)]
struct Entry {
    results: Vec<ProductSummary>,
    inserted_at: Instant,
}

/// Query → results, FIFO-evicted.
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
}

impl ResultCache {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Fresh results for `query`, if any. Expired entries are dropped.
    pub fn get(&mut self, query: &str, now: Instant) -> Option<Vec<ProductSummary>> {
        let expired = {
            let entry = self.entries.get(query)?;
            now.saturating_duration_since(entry.inserted_at) >= self.ttl
        };

        if expired {
            self.remove(query);
            return None;
        }

        self.entries.get(query).map(|entry| entry.results.clone())
    }

    /// Store results for `query`.
    ///
    /// Re-inserting an existing query refreshes its results and timestamp
    /// and moves it to the back of the eviction order.
    pub fn insert(&mut self, query: String, results: Vec<ProductSummary>, now: Instant) {
        if self.entries.contains_key(&query) {
            self.order.retain(|q| q != &query);
        }

        while self.entries.len() >= self.capacity && !self.entries.contains_key(&query) {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }

        self.order.push_back(query.clone());
        self.entries.insert(
            query,
            Entry {
                results,
                inserted_at: now,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    fn remove(&mut self, query: &str) {
        self.entries.remove(query);
        self.order.retain(|q| q != query);
    }
}
