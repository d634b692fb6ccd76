//! Catalog read handlers: categories, category listings, the filtered
//! products page, product detail.
//!
//! These pass normalized catalog records through, adding the computed
//! sale price so clients never re-implement discount rules.

use apple_nation_core::{
    Category, CategoryId, Page, ProductDetail, ProductId, ProductSummary, format_amount,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::listing::{self, Listing, ListingFilter, PriceRange, SortOrder};
use crate::state::AppState;

/// Products per page on category listings.
pub const LISTING_PAGE_SIZE: u32 = 20;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
}

/// Products page query parameters.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    /// Category id, or `all`
    pub category: Option<String>,
    /// Price bucket such as `1000-2500` or `10000-inf`, or `all`
    pub price: Option<String>,
    /// `default`, `price-low`, `price-high`, `name-asc` or `name-desc`
    pub sort: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
}

impl ListingQuery {
    fn category(&self) -> Result<Option<CategoryId>> {
        match self.category.as_deref().map(str::trim) {
            None | Some("" | "all") => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(|id| Some(CategoryId::new(id)))
                .map_err(|_| AppError::BadRequest(format!("invalid category {raw:?}"))),
        }
    }

    fn filter(&self) -> Result<ListingFilter> {
        let price = PriceRange::parse_optional(self.price.as_deref().unwrap_or_default())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let sort = self
            .sort
            .as_deref()
            .unwrap_or_default()
            .parse::<SortOrder>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(ListingFilter::new(
            self.search.as_deref().unwrap_or_default(),
            price,
            sort,
        ))
    }
}

/// A product summary with its computed sale price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: ProductSummary,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub price_display: String,
    pub discounted: bool,
    pub out_of_stock: bool,
}

impl From<ProductSummary> for ProductCard {
    fn from(product: ProductSummary) -> Self {
        let price = product.price();
        Self {
            price_display: format_amount(price),
            discounted: product.is_discounted(),
            out_of_stock: product.is_out_of_stock(),
            price,
            product,
        }
    }
}

/// A product detail with its computed sale price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailView {
    #[serde(flatten)]
    pub product: ProductDetail,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub price_display: String,
}

/// All categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().categories().await?))
}

/// One page of a category's products.
#[instrument(skip(state))]
pub async fn category_products(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Page<ProductCard>>> {
    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::BadRequest("page starts at 1".to_string()));
    }

    let listing = state
        .catalog()
        .category_products(CategoryId::new(id), page, LISTING_PAGE_SIZE)
        .await?;

    Ok(Json(Page {
        items: listing.items.into_iter().map(ProductCard::from).collect(),
        current_page: listing.current_page,
        last_page: listing.last_page,
    }))
}

/// The products page: every category (or one), filtered, sorted and paged.
#[instrument(skip(state))]
pub async fn listing(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Listing<ProductCard>>> {
    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::BadRequest("page starts at 1".to_string()));
    }
    let category = query.category()?;
    let filter = query.filter()?;

    let products = listing::listing_products(state.catalog(), category).await?;
    Ok(Json(listing::apply(products, &filter, page).map(ProductCard::from)))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductDetailView>> {
    let product = state.catalog().product(ProductId::new(id)).await?;
    let price = product.price_for(None);

    Ok(Json(ProductDetailView {
        price_display: format_amount(price),
        price,
        product,
    }))
}
