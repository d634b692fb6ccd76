//! Search index commands.
//!
//! # Environment Variables
//!
//! - `CATALOG_API_URL` - Catalog API base URL (required)
//! - `CATALOG_API_TOKEN` - Optional bearer token
//! - `SEARCH_*` - Index tuning, see the storefront configuration

use std::sync::Arc;

use apple_nation_storefront::catalog::CatalogClient;
use apple_nation_storefront::clock::SystemClock;
use apple_nation_storefront::config::{CatalogConfig, SearchConfig};
use apple_nation_storefront::search::ProductSearch;

use super::print_json;

fn product_search() -> Result<ProductSearch, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let catalog = CatalogClient::new(&CatalogConfig::from_env()?)?;
    Ok(ProductSearch::new(
        Arc::new(catalog),
        SearchConfig::from_env()?,
        Arc::new(SystemClock),
    ))
}

/// Build the index and print its status.
///
/// # Errors
///
/// Returns an error if configuration is missing or output fails. Catalog
/// failures only shrink the index.
pub async fn index() -> Result<(), Box<dyn std::error::Error>> {
    let search = product_search()?;

    tracing::info!("Building search index...");
    let products = search.refresh().await;
    tracing::info!(products, "Search index build finished");

    print_json(&search.status())
}

/// Build the index, run one query and print the outcome.
///
/// # Errors
///
/// Returns an error if configuration is missing or output fails.
pub async fn search(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let search = product_search()?;
    let outcome = search.search(query).await;
    print_json(&outcome)
}
