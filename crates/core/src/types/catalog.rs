//! Canonical catalog records.
//!
//! The upstream catalog API is loosely typed; the storefront normalizes its
//! payloads into these types once, at the fetch boundary, so nothing past
//! that point ever deals with alternate field names.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId, VariantId};
use super::price::Discount;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Declared number of products, as reported by the API.
    pub product_count: u64,
    pub image_url: Option<String>,
    pub banner: Option<String>,
}

/// Lightweight product record used in listings and the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub retail_price: Decimal,
    pub discount: Option<Discount>,
    pub image: String,
    pub current_stock: Option<i64>,
}

impl ProductSummary {
    /// Price after discount.
    #[must_use]
    pub fn price(&self) -> Decimal {
        self.discount
            .map_or(self.retail_price, |d| d.apply(self.retail_price))
    }

    /// Whether the listing has a real discount.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.price() < self.retail_price
    }

    /// Out of stock when the API reports zero or no stock figure at all.
    #[must_use]
    pub fn is_out_of_stock(&self) -> bool {
        matches!(self.current_stock, None | Some(..=0))
    }
}

/// One purchasable configuration of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub color: Option<String>,
    pub storage: Option<String>,
    pub region: Option<String>,
    /// Variant-specific price; falls back to the product's retail price.
    pub sale_price: Option<Decimal>,
    pub in_stock: bool,
}

impl Variant {
    /// Descriptive attributes suitable for a cart line snapshot.
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, String> {
        [
            ("color", &self.color),
            ("storage", &self.storage),
            ("region", &self.region),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name.to_string(), v)))
        .collect()
    }
}

/// Full product record from the detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub summary: ProductSummary,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub specifications: BTreeMap<String, String>,
    pub variants: Vec<Variant>,
}

impl ProductDetail {
    /// Unit price for a variant (or the product when `variant` is `None`),
    /// with the product discount applied.
    #[must_use]
    pub fn price_for(&self, variant: Option<&Variant>) -> Decimal {
        let base = variant
            .and_then(|v| v.sale_price)
            .filter(|p| *p > Decimal::ZERO)
            .unwrap_or(self.summary.retail_price);
        self.summary.discount.map_or(base, |d| d.apply(base))
    }

    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}
