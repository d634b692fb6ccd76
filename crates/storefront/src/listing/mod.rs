//! Filtered, sorted, paginated product listings.
//!
//! The catalog API only pages through one category at a time, so the
//! products page gathers whole categories (see [`collect`]) and then runs
//! the shopper's filters here, in memory:
//!
//! 1. name search (case-insensitive substring)
//! 2. price bucket, against the discounted price
//! 3. sort order
//! 4. pagination, [`PER_PAGE`] products per page

pub mod collect;

use std::cmp::Reverse;
use std::str::FromStr;

use apple_nation_core::ProductSummary;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::search::normalize_query;

pub use collect::{all_products, category_products, listing_products};

/// Products per listing page.
pub const PER_PAGE: u32 = 20;

/// Rejected listing parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("invalid price range {0:?}, expected \"min-max\" or \"min-inf\"")]
    InvalidPrice(String),
    #[error("unknown sort order {0:?}")]
    InvalidSort(String),
}

/// An inclusive price bucket; `max: None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Option<Decimal>,
}

impl PriceRange {
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min && self.max.is_none_or(|max| price <= max)
    }

    /// Parse a bucket, where `"all"` or an empty string means no bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidPrice`] for anything else that is
    /// not `min-max` or `min-inf`.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>, ListingError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "all" {
            return Ok(None);
        }
        raw.parse().map(Some)
    }
}

impl FromStr for PriceRange {
    type Err = ListingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ListingError::InvalidPrice(raw.to_string());
        let (min, max) = raw.split_once('-').ok_or_else(invalid)?;
        let min = Decimal::from_str(min.trim()).map_err(|_| invalid())?;
        let max = match max.trim() {
            "inf" => None,
            max => Some(Decimal::from_str(max).map_err(|_| invalid())?),
        };
        if max.is_some_and(|max| max < min) {
            return Err(invalid());
        }
        Ok(Self { min, max })
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Catalog order.
    #[default]
    Default,
    PriceLow,
    PriceHigh,
    NameAsc,
    NameDesc,
}

impl FromStr for SortOrder {
    type Err = ListingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "" | "default" => Ok(Self::Default),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "name-asc" => Ok(Self::NameAsc),
            "name-desc" => Ok(Self::NameDesc),
            other => Err(ListingError::InvalidSort(other.to_string())),
        }
    }
}

impl SortOrder {
    /// Sort in place. Ties keep their catalog order.
    pub fn apply(self, products: &mut [ProductSummary]) {
        match self {
            Self::Default => {}
            Self::PriceLow => products.sort_by_key(ProductSummary::price),
            Self::PriceHigh => products.sort_by_key(|p| Reverse(p.price())),
            Self::NameAsc => products.sort_by_cached_key(|p| p.name.to_lowercase()),
            Self::NameDesc => products.sort_by_cached_key(|p| Reverse(p.name.to_lowercase())),
        }
    }
}

/// What the shopper asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    /// Normalized name query; empty matches everything.
    pub search: String,
    pub price: Option<PriceRange>,
    pub sort: SortOrder,
}

impl ListingFilter {
    #[must_use]
    pub fn new(search: &str, price: Option<PriceRange>, sort: SortOrder) -> Self {
        Self {
            search: normalize_query(search),
            price,
            sort,
        }
    }

    #[must_use]
    pub fn matches(&self, product: &ProductSummary) -> bool {
        (self.search.is_empty() || product.name.to_lowercase().contains(&self.search))
            && self.price.is_none_or(|range| range.contains(product.price()))
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: usize,
    pub per_page: u32,
}

impl<T> Listing<T> {
    /// Convert the items, keeping the page figures.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_items: self.total_items,
            per_page: self.per_page,
        }
    }
}

/// Filter, sort and cut out page `page` (1-based).
///
/// A page past the end is empty but still reports the real totals.
#[must_use]
pub fn apply(
    products: Vec<ProductSummary>,
    filter: &ListingFilter,
    page: u32,
) -> Listing<ProductSummary> {
    let page = page.max(1);
    let mut matching: Vec<ProductSummary> =
        products.into_iter().filter(|p| filter.matches(p)).collect();
    filter.sort.apply(&mut matching);

    let total_items = matching.len();
    let per_page = PER_PAGE as usize;
    let total_pages = u32::try_from(total_items.div_ceil(per_page)).unwrap_or(u32::MAX);
    let start = usize::try_from(page - 1)
        .unwrap_or(usize::MAX)
        .saturating_mul(per_page);

    Listing {
        items: matching.into_iter().skip(start).take(per_page).collect(),
        current_page: page,
        total_pages,
        total_items,
        per_page: PER_PAGE,
    }
}
