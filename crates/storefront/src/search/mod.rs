//! Product search.
//!
//! Search is a case-insensitive substring match over product names, served
//! from an in-memory product list (the index) built from the catalog API.
//!
//! - The index is built in the background at startup and rebuilt lazily by
//!   the first search after it goes stale.
//! - Only one build runs at a time; searches that find a build in progress
//!   poll for it to finish, then use whatever index exists.
//! - Results are cached per normalized query with FIFO eviction.
//! - Catalog failures shrink the index, they never fail a search.
//! - Keystroke suggestions are debounced per visitor; a query superseded by
//!   a newer one from the same visitor answers `superseded`.

mod debounce;
mod indexer;
mod result_cache;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use apple_nation_core::ProductSummary;
use moka::sync::Cache;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::catalog::CatalogSource;
use crate::clock::Clock;
use crate::config::SearchConfig;

pub use debounce::{Debouncer, QuerySequencer, Ticket};
pub use indexer::{build_product_list, merge_unique, select_top_categories};
pub use result_cache::ResultCache;

/// Queries shorter than this (after trimming) are not searched.
pub const MIN_QUERY_CHARS: usize = 2;

/// The answer to a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "results", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// At least one product matched.
    Results(Vec<ProductSummary>),
    /// The query was searched and nothing matched.
    NoResults,
    /// The query was too short to search.
    TooShort,
    /// A newer query from the same visitor replaced this one.
    Superseded,
}

impl SearchOutcome {
    fn from_results(results: Vec<ProductSummary>) -> Self {
        if results.is_empty() {
            Self::NoResults
        } else {
            Self::Results(results)
        }
    }

    /// The matched products (empty for the other outcomes).
    #[must_use]
    pub fn products(&self) -> &[ProductSummary] {
        match self {
            Self::Results(products) => products,
            Self::NoResults | Self::TooShort | Self::Superseded => &[],
        }
    }
}

/// Snapshot of the index for health checks and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchStatus {
    pub ready: bool,
    pub stale: bool,
    pub building: bool,
    pub products: usize,
    pub age_secs: Option<u64>,
    pub cached_queries: usize,
}

#[derive(Debug)]
struct IndexSnapshot {
    products: Arc<Vec<ProductSummary>>,
    built_at: Instant,
}

/// Product search over a lazily rebuilt index.
///
/// Cheap to clone; clones share the index and caches.
#[derive(Clone)]
pub struct ProductSearch {
    inner: Arc<ProductSearchInner>,
}

struct ProductSearchInner {
    catalog: Arc<dyn CatalogSource>,
    config: SearchConfig,
    clock: Arc<dyn Clock>,
    index: RwLock<Option<IndexSnapshot>>,
    cache: Mutex<ResultCache>,
    building: AtomicBool,
    /// Bumped by `invalidate` so an in-flight build does not resurrect
    /// a dropped index.
    generation: AtomicU64,
    /// One debouncer per visitor typing into the search box.
    debouncers: Cache<String, Debouncer>,
}

impl std::fmt::Debug for ProductSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductSearch")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

const MAX_DEBOUNCED_VISITORS: u64 = 10_000;
const DEBOUNCER_IDLE: Duration = Duration::from_secs(10 * 60);

/// Clears the build flag when the build ends, even on cancellation.
struct BuildGuard<'a>(&'a AtomicBool);

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ProductSearch {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        config: SearchConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = ResultCache::new(config.cache_capacity, config.cache_ttl);
        let debouncers = Cache::builder()
            .max_capacity(MAX_DEBOUNCED_VISITORS)
            .time_to_idle(DEBOUNCER_IDLE)
            .build();
        Self {
            inner: Arc::new(ProductSearchInner {
                catalog,
                config,
                clock,
                index: RwLock::new(None),
                cache: Mutex::new(cache),
                building: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                debouncers,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.inner.config
    }

    /// Search product names.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let normalized = normalize_query(query);
        if normalized.chars().count() < MIN_QUERY_CHARS {
            return SearchOutcome::TooShort;
        }

        if let Some(cached) = self.cached(&normalized) {
            debug!(count = cached.len(), "Search cache hit");
            return SearchOutcome::from_results(cached);
        }

        self.ensure_index().await;

        let Some(products) = self.products() else {
            // Nothing to search yet; do not cache an answer from no data.
            debug!("Search index unavailable");
            return SearchOutcome::NoResults;
        };

        let results = filter_products(&products, &normalized, self.inner.config.result_limit);
        debug!(count = results.len(), "Search complete");

        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalized, results.clone(), self.inner.clock.now());

        SearchOutcome::from_results(results)
    }

    /// Debounced search for a visitor typing into the search box.
    ///
    /// Waits out the debounce window first. If the same visitor sends
    /// another query before this one is answered, this one returns
    /// [`SearchOutcome::Superseded`] instead of its results.
    #[instrument(skip(self, visitor), fields(query = %query))]
    pub async fn suggest(&self, visitor: &str, query: &str) -> SearchOutcome {
        let window = self.inner.config.debounce;
        let debouncer = self
            .inner
            .debouncers
            .get_with_by_ref(visitor, || Debouncer::new(window));

        match debouncer.run(|| self.search(query)).await {
            Some(outcome) => outcome,
            None => {
                debug!("Suggestion superseded by a newer query");
                SearchOutcome::Superseded
            }
        }
    }

    /// Make sure a fresh index exists, building or waiting for one.
    pub async fn ensure_index(&self) {
        if self.has_fresh_index() {
            return;
        }

        match self.try_begin_build() {
            Some(guard) => {
                // Another build may have finished since the check above.
                if self.has_fresh_index() {
                    return;
                }
                self.build(guard).await;
            }
            None => self.wait_for_build().await,
        }
    }

    /// Rebuild the index now, regardless of its age.
    ///
    /// If a build is already running this waits for it instead. Returns the
    /// number of indexed products afterwards.
    pub async fn refresh(&self) -> usize {
        match self.try_begin_build() {
            Some(guard) => self.build(guard).await,
            None => self.wait_for_build().await,
        }
        self.products().map_or(0, |products| products.len())
    }

    /// Spawn the initial index build.
    pub fn start_background_build(&self) -> JoinHandle<()> {
        info!("Spawning background search index build task");
        let search = self.clone();
        tokio::spawn(async move {
            search.ensure_index().await;
            let status = search.status();
            if status.ready {
                info!(products = status.products, "Search index is now ready");
            } else {
                warn!("Search index build finished without any products");
            }
        })
    }

    /// Whether an index has been built (stale or not).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[must_use]
    pub fn status(&self) -> SearchStatus {
        let now = self.inner.clock.now();
        let (ready, products, age) = self
            .inner
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or((false, 0, None), |snapshot| {
                (
                    true,
                    snapshot.products.len(),
                    Some(now.saturating_duration_since(snapshot.built_at)),
                )
            });

        SearchStatus {
            ready,
            stale: age.is_none_or(|age| age >= self.inner.config.index_ttl),
            building: self.inner.building.load(Ordering::Acquire),
            products,
            age_secs: age.map(|age| age.as_secs()),
            cached_queries: self
                .inner
                .cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }

    /// Drop the index and all cached results.
    pub fn invalidate(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        *self
            .inner
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!("Search index invalidated");
    }

    fn cached(&self, query: &str) -> Option<Vec<ProductSummary>> {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query, self.inner.clock.now())
    }

    fn products(&self) -> Option<Arc<Vec<ProductSummary>>> {
        self.inner
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|snapshot| Arc::clone(&snapshot.products))
    }

    fn has_fresh_index(&self) -> bool {
        let now = self.inner.clock.now();
        self.inner
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|snapshot| {
                now.saturating_duration_since(snapshot.built_at) < self.inner.config.index_ttl
            })
    }

    fn try_begin_build(&self) -> Option<BuildGuard<'_>> {
        self.inner
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BuildGuard(&self.inner.building))
    }

    #[instrument(skip_all)]
    async fn build(&self, guard: BuildGuard<'_>) {
        let generation = self.inner.generation.load(Ordering::Acquire);
        let products =
            build_product_list(self.inner.catalog.as_ref(), &self.inner.config).await;

        if products.is_empty() {
            warn!("Search index build produced no products, keeping previous index");
        } else if self.inner.generation.load(Ordering::Acquire) != generation {
            debug!("Search index invalidated during build, discarding result");
        } else {
            let count = products.len();
            *self
                .inner
                .index
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(IndexSnapshot {
                products: Arc::new(products),
                built_at: self.inner.clock.now(),
            });
            info!(products = count, "Search index updated");
        }

        drop(guard);
    }

    /// Poll until the running build finishes or the retry budget runs out.
    async fn wait_for_build(&self) {
        let config = &self.inner.config;
        for attempt in 1..=config.poll_retries {
            tokio::time::sleep(config.poll_interval).await;
            if !self.inner.building.load(Ordering::Acquire) {
                debug!(attempt, "Search index build finished while waiting");
                return;
            }
        }
        debug!(
            waited_ms = (config.poll_interval * config.poll_retries).as_millis(),
            "Gave up waiting for search index build"
        );
    }
}

/// Trim and lower-case a query.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Products whose lower-cased name contains `query`, at most `limit`.
///
/// `query` must already be normalized.
#[must_use]
pub fn filter_products(
    products: &[ProductSummary],
    query: &str,
    limit: usize,
) -> Vec<ProductSummary> {
    products
        .iter()
        .filter(|product| product.name.to_lowercase().contains(query))
        .take(limit)
        .cloned()
        .collect()
}
