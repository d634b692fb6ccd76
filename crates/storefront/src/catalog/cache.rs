//! Cache types for catalog API responses.

use apple_nation_core::{Category, CategoryId, Page, ProductDetail, ProductId, ProductSummary};

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    CategoryPage {
        category: CategoryId,
        page: u32,
        per_page: u32,
    },
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    CategoryPage(Page<ProductSummary>),
    Product(Box<ProductDetail>),
}
