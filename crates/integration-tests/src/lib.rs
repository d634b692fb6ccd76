//! Integration tests for Apple Nation.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p apple-nation-integration-tests
//! ```
//!
//! No network or server is needed: the catalog is a scripted
//! [`FakeCatalog`], storage is in memory or in a temp directory, and time
//! comes from a `ManualClock`.
//!
//! # Test Categories
//!
//! - `cart_persistence` - cart slots across store instances
//! - `search_index` - index builds, caching and supersession
//! - `checkout_flow` - order placement end to end
//! - `product_listing` - the filtered products page over whole categories
//! - `http_api` - the JSON routes through the full middleware stack

#![allow(
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    clippy::cast_possible_truncation
)]

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use apple_nation_core::{
    Category, CategoryId, Page, ProductDetail, ProductId, ProductSummary,
};
use apple_nation_storefront::cart::{MemoryStorage, SlotStorage};
use apple_nation_storefront::catalog::{CatalogError, CatalogSource};
use apple_nation_storefront::clock::ManualClock;
use apple_nation_storefront::config::{CatalogConfig, SearchConfig, StorefrontConfig};
use apple_nation_storefront::state::AppState;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// A product summary with a plain price and the placeholder image.
#[must_use]
pub fn product(id: i64, name: &str, price: i64) -> ProductSummary {
    ProductSummary {
        id: ProductId::new(id),
        name: name.to_string(),
        retail_price: Decimal::new(price, 0),
        discount: None,
        image: "/globe.svg".to_string(),
        current_stock: Some(5),
    }
}

/// Scripted in-memory catalog.
#[derive(Default)]
pub struct FakeCatalog {
    categories: Vec<Category>,
    products: HashMap<i64, Vec<ProductSummary>>,
    failing: HashSet<i64>,
    slow: HashMap<i64, Duration>,
    build_delay: Duration,
    category_calls: AtomicUsize,
    page_calls: AtomicUsize,
}

impl FakeCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category whose declared count is the number of products.
    #[must_use]
    pub fn category(self, id: i64, products: Vec<ProductSummary>) -> Self {
        let count = products.len() as u64;
        self.category_with_count(id, count, products)
    }

    /// Add a category with an explicit declared count.
    #[must_use]
    pub fn category_with_count(
        mut self,
        id: i64,
        product_count: u64,
        products: Vec<ProductSummary>,
    ) -> Self {
        self.categories.push(Category {
            id: CategoryId::new(id),
            name: format!("Category {id}"),
            product_count,
            image_url: None,
            banner: None,
        });
        self.products.insert(id, products);
        self
    }

    /// Make a category's listing fail.
    #[must_use]
    pub fn failing(mut self, id: i64) -> Self {
        self.failing.insert(id);
        self
    }

    /// Make a category's listing take `delay`.
    #[must_use]
    pub fn slow(mut self, id: i64, delay: Duration) -> Self {
        self.slow.insert(id, delay);
        self
    }

    /// Delay the category list, stretching every build.
    #[must_use]
    pub const fn build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = delay;
        self
    }

    /// Number of category list fetches, i.e. index builds started.
    pub fn builds(&self) -> usize {
        self.category_calls.load(Ordering::SeqCst)
    }

    /// Number of category page fetches.
    pub fn page_fetches(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    fn all_products(&self) -> impl Iterator<Item = &ProductSummary> {
        self.products.values().flatten()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        if !self.build_delay.is_zero() {
            tokio::time::sleep(self.build_delay).await;
        }
        Ok(self.categories.clone())
    }

    async fn category_products(
        &self,
        category: CategoryId,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProductSummary>, CatalogError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let id = category.as_i64();

        if let Some(delay) = self.slow.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&id) {
            return Err(CatalogError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let all = self.products.get(&id).map_or(&[][..], Vec::as_slice);
        let items: Vec<ProductSummary> = all
            .iter()
            .skip(((page.max(1) - 1) * per_page) as usize)
            .take(per_page as usize)
            .cloned()
            .collect();
        let last_page = u32::try_from(all.len().div_ceil(per_page.max(1) as usize))
            .unwrap()
            .max(1);

        Ok(Page {
            items,
            current_page: page,
            last_page,
        })
    }

    async fn product(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        self.all_products()
            .find(|p| p.id == id)
            .map(|summary| ProductDetail {
                summary: summary.clone(),
                description: None,
                images: vec![summary.image.clone()],
                specifications: std::collections::BTreeMap::new(),
                variants: Vec::new(),
            })
            .ok_or_else(|| CatalogError::NotFound(format!("products/{id}")))
    }
}

/// The phones-and-audio catalog used across tests.
#[must_use]
pub fn apple_catalog() -> FakeCatalog {
    FakeCatalog::new()
        .category(
            1,
            vec![
                product(1, "iPhone 15", 120_000),
                product(2, "iPhone 15 Pro", 150_000),
            ],
        )
        .category(
            2,
            vec![
                product(3, "AirPods Pro", 25_000),
                product(2, "iPhone 15 Pro", 150_000),
            ],
        )
}

/// Search settings with short polling for tests.
#[must_use]
pub fn search_config() -> SearchConfig {
    SearchConfig {
        category_timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(5),
        poll_retries: 100,
        ..SearchConfig::default()
    }
}

/// Server configuration pointing at nothing real.
#[must_use]
pub fn storefront_config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        data_dir: PathBuf::from("./data"),
        cart_idle: Duration::from_secs(1800),
        catalog: CatalogConfig {
            base_url: url::Url::parse("http://catalog.invalid/api/").unwrap(),
            api_token: None,
            timeout: Duration::from_secs(1),
        },
        search: search_config(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Everything a test needs to drive the storefront.
pub struct TestContext {
    pub state: AppState,
    pub catalog: Arc<FakeCatalog>,
    pub storage: Arc<dyn SlotStorage>,
    pub clock: ManualClock,
}

impl TestContext {
    /// In-memory storage, manual clock.
    #[must_use]
    pub fn new(catalog: FakeCatalog) -> Self {
        Self::with_storage(catalog, Arc::new(MemoryStorage::new()))
    }

    #[must_use]
    pub fn with_storage(catalog: FakeCatalog, storage: Arc<dyn SlotStorage>) -> Self {
        let catalog = Arc::new(catalog);
        let clock = ManualClock::starting_at(
            chrono::DateTime::from_timestamp_millis(1_717_000_000_000).unwrap(),
        );
        let state = AppState::from_parts(
            storefront_config(),
            Arc::clone(&catalog) as Arc<dyn CatalogSource>,
            Arc::clone(&storage),
            Arc::new(clock.clone()),
        );

        Self {
            state,
            catalog,
            storage,
            clock,
        }
    }
}
