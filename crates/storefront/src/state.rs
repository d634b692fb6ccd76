//! Application state shared across handlers.

use std::sync::Arc;

use crate::cart::{CartRegistry, FileStorage, ScopedStorage, SlotStorage, StorageError};
use crate::catalog::{CatalogClient, CatalogError, CatalogSource};
use crate::clock::{Clock, SystemClock};
use crate::config::StorefrontConfig;
use crate::search::ProductSearch;

/// Error creating the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("catalog client: {0}")]
    Catalog(#[from] CatalogError),
    #[error("data directory: {0}")]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the catalog, search index, carts and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<dyn CatalogSource>,
    search: ProductSearch,
    carts: CartRegistry,
    storage: Arc<dyn SlotStorage>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create the production state: HTTP catalog, file storage, system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog client cannot be built or the data
    /// directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let catalog = Arc::new(CatalogClient::new(&config.catalog)?);
        let storage = Arc::new(FileStorage::open(&config.data_dir)?);
        Ok(Self::from_parts(config, catalog, storage, Arc::new(SystemClock)))
    }

    /// Assemble state from explicit parts.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        catalog: Arc<dyn CatalogSource>,
        storage: Arc<dyn SlotStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let search = ProductSearch::new(
            Arc::clone(&catalog),
            config.search.clone(),
            Arc::clone(&clock),
        );
        let carts = CartRegistry::with_idle_timeout(Arc::clone(&storage), config.cart_idle);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                search,
                carts,
                storage,
                clock,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogSource {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn search(&self) -> &ProductSearch {
        &self.inner.search
    }

    #[must_use]
    pub fn carts(&self) -> &CartRegistry {
        &self.inner.carts
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Storage slots belonging to one visitor.
    #[must_use]
    pub fn visitor_storage(&self, visitor: &str) -> ScopedStorage {
        ScopedStorage::new(Arc::clone(&self.inner.storage), visitor)
    }

    /// Start building the search index in the background.
    pub fn start_search_indexing(&self) {
        drop(self.inner.search.start_background_build());
    }
}
