//! Gathering whole categories for the listing page.
//!
//! Every page of a category is fetched (page one first, to learn the page
//! count, then the rest concurrently). Individual pages and categories may
//! fail without failing the listing. Responses are cached by the catalog
//! client, so repeated walks are cheap.

use apple_nation_core::{CategoryId, ProductSummary};
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::catalog::{CatalogError, CatalogSource};
use crate::search::merge_unique;

use super::PER_PAGE;

/// Upper bound on pages fetched from one category.
pub const MAX_PAGES_PER_CATEGORY: u32 = 50;

/// Every product of one category, in catalog order.
///
/// # Errors
///
/// Returns the error from the first page. Later pages that fail are
/// skipped.
#[instrument(skip(catalog), fields(category_id = %category))]
pub async fn category_products(
    catalog: &dyn CatalogSource,
    category: CategoryId,
) -> Result<Vec<ProductSummary>, CatalogError> {
    let first = catalog.category_products(category, 1, PER_PAGE).await?;
    let last_page = first.last_page.min(MAX_PAGES_PER_CATEGORY);

    let rest = (2..=last_page).map(|page| async move {
        match catalog.category_products(category, page, PER_PAGE).await {
            Ok(listing) => listing.items,
            Err(e) => {
                warn!(page, error = %e, "Failed to fetch listing page, skipping");
                Vec::new()
            }
        }
    });

    let mut pages = vec![first.items];
    pages.extend(join_all(rest).await);
    let products: Vec<ProductSummary> = pages.into_iter().flatten().collect();
    debug!(count = products.len(), pages = last_page, "Collected category");
    Ok(products)
}

/// Every product of every non-empty category, first occurrence of each id.
///
/// # Errors
///
/// Returns an error only when the category list itself cannot be fetched.
#[instrument(skip_all)]
pub async fn all_products(
    catalog: &dyn CatalogSource,
) -> Result<Vec<ProductSummary>, CatalogError> {
    let categories = catalog.categories().await?;

    let fetches = categories
        .iter()
        .filter(|category| category.product_count > 0)
        .map(|category| async move {
            category_products(catalog, category.id)
                .await
                .unwrap_or_else(|e| {
                    warn!(category_id = %category.id, error = %e, "Failed to collect category");
                    Vec::new()
                })
        });

    let products = merge_unique(join_all(fetches).await);
    debug!(count = products.len(), "Collected all products");
    Ok(products)
}

/// Products behind the listing page.
///
/// With a category, that category's products; if the category cannot be
/// fetched or is empty, every product instead.
///
/// # Errors
///
/// Returns an error when falling back to every product fails.
pub async fn listing_products(
    catalog: &dyn CatalogSource,
    category: Option<CategoryId>,
) -> Result<Vec<ProductSummary>, CatalogError> {
    if let Some(category) = category {
        match category_products(catalog, category).await {
            Ok(products) if !products.is_empty() => return Ok(products),
            Ok(_) => debug!(category_id = %category, "Category empty, listing everything"),
            Err(e) => {
                warn!(category_id = %category, error = %e, "Category unavailable, listing everything");
            }
        }
    }
    all_products(catalog).await
}
