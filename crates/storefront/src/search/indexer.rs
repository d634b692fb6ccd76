//! Product list builder.
//!
//! The catalog API has no "all products" endpoint, so the index is
//! assembled from the first page of the largest categories. Products that
//! only appear in smaller categories, or past page one, are not searchable.

use std::collections::HashSet;
use std::time::Instant;

use apple_nation_core::{Category, ProductSummary};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::catalog::CatalogSource;
use crate::config::SearchConfig;

/// Fetch and merge the products that make up the search index.
///
/// Never fails: a failed category list yields no products, and a failed or
/// timed-out category contributes nothing while the others still count.
#[instrument(skip_all, fields(top = config.top_categories))]
pub async fn build_product_list(
    catalog: &dyn CatalogSource,
    config: &SearchConfig,
) -> Vec<ProductSummary> {
    let started = Instant::now();

    let categories = match catalog.categories().await {
        Ok(categories) => categories,
        Err(e) => {
            warn!(error = %e, "Failed to fetch categories for search index");
            return Vec::new();
        }
    };

    let selected = select_top_categories(categories, config.top_categories);
    debug!(count = selected.len(), "Selected categories for search index");

    let fetches = selected.iter().map(|category| async move {
        let fetch = catalog.category_products(category.id, 1, config.page_size);
        match tokio::time::timeout(config.category_timeout, fetch).await {
            Ok(Ok(page)) => {
                debug!(
                    category_id = %category.id,
                    count = page.items.len(),
                    "Fetched category products"
                );
                page.items
            }
            Ok(Err(e)) => {
                warn!(
                    category_id = %category.id,
                    error = %e,
                    "Failed to fetch category products"
                );
                Vec::new()
            }
            Err(_) => {
                warn!(
                    category_id = %category.id,
                    timeout_ms = config.category_timeout.as_millis(),
                    "Timed out fetching category products"
                );
                Vec::new()
            }
        }
    });

    let pages = join_all(fetches).await;
    let products = merge_unique(pages);

    info!(
        categories = selected.len(),
        products = products.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "Built search product list"
    );

    products
}

/// Categories with products, largest first, at most `limit`.
#[must_use]
pub fn select_top_categories(mut categories: Vec<Category>, limit: usize) -> Vec<Category> {
    categories.retain(|category| category.product_count > 0);
    // Stable sort keeps API order among equal counts.
    categories.sort_by(|a, b| b.product_count.cmp(&a.product_count));
    categories.truncate(limit);
    categories
}

/// Concatenate pages, keeping the first occurrence of each product id.
#[must_use]
pub fn merge_unique(pages: Vec<Vec<ProductSummary>>) -> Vec<ProductSummary> {
    let mut seen = HashSet::new();
    pages
        .into_iter()
        .flatten()
        .filter(|product| seen.insert(product.id))
        .collect()
}
