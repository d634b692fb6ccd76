//! Raw payload to canonical record conversions.
//!
//! This is the only place that knows about alternate upstream field names.
//! Precedence rules:
//!
//! - product image: `image_path`, `image_url`, `thumbnail`, first of
//!   `images`, first of `image_paths`, then the placeholder
//! - listing items: `data.data`, `data`, bare array
//! - page count: `last_page`, `total_pages`, `ceil(total / per_page)`, 1
//!
//! Records without a usable id are dropped rather than failing the batch.

use std::collections::BTreeMap;

use apple_nation_core::{
    CategoryId, Category, Discount, DiscountKind, PLACEHOLDER_IMAGE, Page, ProductDetail,
    ProductId, ProductSummary, Variant, VariantId,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use super::raw::{
    RawCategory, RawListing, RawListingData, RawPaginated, RawProduct, RawVariant, as_decimal,
    as_flag, as_i64, as_text,
};

// =============================================================================
// Categories
// =============================================================================

/// Convert a raw category. Returns `None` when it has no id.
pub fn convert_category(raw: RawCategory) -> Option<Category> {
    let id = CategoryId::new(as_i64(&raw.category_id)?);
    Some(Category {
        id,
        name: as_text(&raw.name).unwrap_or_default(),
        product_count: as_i64(&raw.product_count)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0),
        image_url: as_text(&raw.image_url),
        banner: as_text(&raw.banner),
    })
}

/// Convert a list of raw categories, dropping unusable entries.
pub fn convert_categories(raw: Vec<RawCategory>) -> Vec<Category> {
    let total = raw.len();
    let categories: Vec<Category> = raw.into_iter().filter_map(convert_category).collect();
    if categories.len() != total {
        debug!(
            dropped = total - categories.len(),
            "Dropped categories without an id"
        );
    }
    categories
}

// =============================================================================
// Products
// =============================================================================

/// Pick the product image by the fixed precedence order.
fn resolve_image(raw: &RawProduct) -> String {
    as_text(&raw.image_path)
        .or_else(|| as_text(&raw.image_url))
        .or_else(|| as_text(&raw.thumbnail))
        .or_else(|| image_list(&raw.images).into_iter().next())
        .or_else(|| image_list(&raw.image_paths).into_iter().next())
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string())
}

/// Read an image list that may hold plain URLs or `{image_path|image_url|url}` objects.
fn image_list(value: &Value) -> Vec<String> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(obj) => ["image_path", "image_url", "url", "path"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(as_text)),
            other => as_text(other),
        })
        .collect()
}

fn convert_discount(raw: &RawProduct) -> Option<Discount> {
    let amount = as_decimal(&raw.discount)?;
    let label = as_text(&raw.discount_type);
    Discount::new(amount, DiscountKind::from_label(label.as_deref()))
}

/// Convert a raw product into a summary. Returns `None` when it has no id.
pub fn convert_summary(raw: &RawProduct) -> Option<ProductSummary> {
    let id = ProductId::new(as_i64(&raw.id)?);
    Some(ProductSummary {
        id,
        name: as_text(&raw.name).unwrap_or_default(),
        retail_price: as_decimal(&raw.retails_price)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO),
        discount: convert_discount(raw),
        image: resolve_image(raw),
        current_stock: as_i64(&raw.current_stock),
    })
}

fn convert_variant(raw: &RawVariant) -> Option<Variant> {
    Some(Variant {
        id: VariantId::new(as_i64(&raw.id)?),
        color: as_text(&raw.color),
        storage: as_text(&raw.storage),
        region: as_text(&raw.region),
        sale_price: as_decimal(&raw.sale_price).filter(|p| *p > Decimal::ZERO),
        in_stock: as_flag(&raw.in_stock),
    })
}

/// Read specifications given either as an object or as a list of
/// `{name|title|key, value|description}` rows.
fn convert_specifications(value: &Value) -> BTreeMap<String, String> {
    match value {
        Value::Object(obj) => obj
            .iter()
            .filter_map(|(name, v)| as_text(v).map(|text| (name.clone(), text)))
            .collect(),
        Value::Array(rows) => rows
            .iter()
            .filter_map(|row| {
                let name = ["name", "title", "key"]
                    .iter()
                    .find_map(|key| row.get(*key).and_then(as_text))?;
                let text = ["value", "description"]
                    .iter()
                    .find_map(|key| row.get(*key).and_then(as_text))?;
                Some((name, text))
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Convert a raw product from the detail endpoint.
pub fn convert_detail(raw: &RawProduct) -> Option<ProductDetail> {
    let summary = convert_summary(raw)?;

    let mut images = image_list(&raw.images);
    if images.is_empty() {
        images = image_list(&raw.image_paths);
    }
    if images.is_empty() && summary.image != PLACEHOLDER_IMAGE {
        images.push(summary.image.clone());
    }

    // Variants only count when the product says it has them
    let has_variants = raw.have_variant.is_null() || as_flag(&raw.have_variant);
    let variants = if has_variants {
        raw.imeis.iter().filter_map(convert_variant).collect()
    } else {
        Vec::new()
    };

    Some(ProductDetail {
        summary,
        description: as_text(&raw.description),
        images,
        specifications: convert_specifications(&raw.specifications),
        variants,
    })
}

// =============================================================================
// Listings
// =============================================================================

/// Resolve the last page number by the fixed precedence order.
fn resolve_last_page(paginated: &RawPaginated, per_page: u32) -> u32 {
    let positive = |v: &Value| {
        as_i64(v)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
    };

    positive(&paginated.last_page)
        .or_else(|| positive(&paginated.total_pages))
        .or_else(|| {
            let total = positive(&paginated.total)?;
            (per_page > 0).then(|| total.div_ceil(per_page))
        })
        .unwrap_or(1)
}

/// Convert a listing response into a page of summaries.
pub fn convert_listing(raw: RawListing, page: u32, per_page: u32) -> Page<ProductSummary> {
    let (items, current_page, last_page) = match raw {
        RawListing::Enveloped(envelope) => match envelope.data {
            RawListingData::Paginated(paginated) => {
                let last_page = resolve_last_page(&paginated, per_page);
                let current = as_i64(&paginated.current_page)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(page);
                (paginated.data, current, last_page)
            }
            RawListingData::Items(items) => (items, page, page),
        },
        RawListing::Bare(items) => (items, page, page),
    };

    Page {
        items: items.iter().filter_map(convert_summary).collect(),
        current_page,
        last_page: last_page.max(current_page),
    }
}

/// Extract the product record from a detail `data` member, which is usually
/// an object but sometimes a one-element array.
pub fn detail_payload(data: Value) -> Option<RawProduct> {
    let object = match data {
        Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    serde_json::from_value(object).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_product(value: Value) -> RawProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_image_precedence() {
        let all = raw_product(json!({
            "id": 1, "image_path": "a.jpg", "image_url": "b.jpg", "thumbnail": "c.jpg"
        }));
        assert_eq!(convert_summary(&all).unwrap().image, "a.jpg");

        let no_path = raw_product(json!({"id": 1, "image_url": "b.jpg", "thumbnail": "c.jpg"}));
        assert_eq!(convert_summary(&no_path).unwrap().image, "b.jpg");

        let thumb = raw_product(json!({"id": 1, "image_path": "", "thumbnail": "c.jpg"}));
        assert_eq!(convert_summary(&thumb).unwrap().image, "c.jpg");

        let list = raw_product(json!({"id": 1, "images": [{"image_path": "d.jpg"}]}));
        assert_eq!(convert_summary(&list).unwrap().image, "d.jpg");

        let none = raw_product(json!({"id": 1}));
        assert_eq!(convert_summary(&none).unwrap().image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_summary_prices_and_discount() {
        let product = raw_product(json!({
            "id": "77",
            "name": "iPad Air",
            "retails_price": "80000",
            "discount": 5,
            "discount_type": "Percentage",
            "current_stock": 4
        }));
        let summary = convert_summary(&product).unwrap();
        assert_eq!(summary.id, ProductId::new(77));
        assert_eq!(summary.retail_price, Decimal::new(80_000, 0));
        assert_eq!(summary.price(), Decimal::new(76_000, 0));
        assert_eq!(summary.current_stock, Some(4));
    }

    #[test]
    fn test_summary_without_id_is_dropped() {
        assert!(convert_summary(&raw_product(json!({"name": "ghost"}))).is_none());
    }

    #[test]
    fn test_category_conversion() {
        let raw: Vec<RawCategory> = serde_json::from_value(json!([
            {"category_id": 3, "name": "iPhone", "product_count": "42", "image_url": "i.png"},
            {"name": "broken"},
            {"id": 9, "name": "Mac", "product_count": null}
        ]))
        .unwrap();
        let categories = convert_categories(raw);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].product_count, 42);
        assert_eq!(categories[1].id, CategoryId::new(9));
        assert_eq!(categories[1].product_count, 0);
    }

    #[test]
    fn test_listing_last_page_precedence() {
        let raw: RawListing = serde_json::from_value(json!({
            "data": {"data": [{"id": 1}], "total_pages": 3, "total": 100}
        }))
        .unwrap();
        assert_eq!(convert_listing(raw, 1, 20).last_page, 3);

        let raw: RawListing =
            serde_json::from_value(json!({"data": {"data": [{"id": 1}], "total": 41}})).unwrap();
        assert_eq!(convert_listing(raw, 1, 20).last_page, 3);

        let raw: RawListing =
            serde_json::from_value(json!({"data": {"data": [], "last_page": 0}})).unwrap();
        assert_eq!(convert_listing(raw, 1, 20).last_page, 1);
    }

    #[test]
    fn test_listing_flat_and_bare() {
        let raw: RawListing =
            serde_json::from_value(json!({"success": true, "data": [{"id": 1}, {"id": 2}]}))
                .unwrap();
        let page = convert_listing(raw, 2, 30);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.current_page, 2);
        assert!(!page.has_more());

        let raw: RawListing = serde_json::from_value(json!([{"id": 5}, {"name": "x"}])).unwrap();
        assert_eq!(convert_listing(raw, 1, 30).items.len(), 1);
    }

    #[test]
    fn test_detail_with_variants_and_specs() {
        let data = json!([{
            "id": 10,
            "name": "iPhone 15 Pro",
            "retails_price": 150000,
            "have_variant": 1,
            "image_paths": ["front.jpg", "back.jpg"],
            "specifications": [{"name": "Chip", "description": "A17 Pro"}],
            "imeis": [
                {"id": 1, "color": "Natural", "storage": "256GB", "sale_price": 160000, "in_stock": 1},
                {"id": 2, "color": "Blue", "storage": "128GB", "sale_price": null, "in_stock": 0}
            ]
        }]);
        let raw = detail_payload(data).unwrap();
        let detail = convert_detail(&raw).unwrap();

        assert_eq!(detail.images, ["front.jpg", "back.jpg"]);
        assert_eq!(detail.summary.image, "front.jpg");
        assert_eq!(
            detail.specifications.get("Chip").map(String::as_str),
            Some("A17 Pro")
        );
        assert_eq!(detail.variants.len(), 2);
        assert!(detail.variants[0].in_stock);
        assert!(!detail.variants[1].in_stock);
        assert_eq!(detail.variants[1].sale_price, None);
    }

    #[test]
    fn test_detail_ignores_variants_when_flag_off() {
        let raw = raw_product(json!({
            "id": 10, "have_variant": 0, "imeis": [{"id": 1}]
        }));
        assert!(convert_detail(&raw).unwrap().variants.is_empty());
    }
}
