//! Raw catalog API payloads.
//!
//! These mirror what the upstream API actually sends, including every
//! alternate spelling we have seen for the same concept. Scalar fields are
//! kept as [`Value`] because the API mixes numbers, numeric strings and
//! `null` freely; [`super::conversions`] turns them into canonical types.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// The `{success, data}` wrapper used by most endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

/// Response of the category products endpoint.
///
/// Observed shapes, in precedence order: `{data: {data: [...], last_page}}`,
/// `{data: [...]}`, and a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawListing {
    Enveloped(Envelope<RawListingData>),
    Bare(Vec<RawProduct>),
}

/// The `data` member of an enveloped listing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawListingData {
    Paginated(RawPaginated),
    Items(Vec<RawProduct>),
}

/// Laravel-style paginator payload.
#[derive(Debug, Deserialize)]
pub struct RawPaginated {
    pub data: Vec<RawProduct>,
    #[serde(default)]
    pub current_page: Value,
    #[serde(default)]
    pub last_page: Value,
    #[serde(default)]
    pub total_pages: Value,
    #[serde(default)]
    pub total: Value,
}

/// A category as sent by the API.
#[derive(Debug, Deserialize)]
pub struct RawCategory {
    #[serde(default, alias = "id")]
    pub category_id: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub product_count: Value,
    #[serde(default)]
    pub image_url: Value,
    #[serde(default)]
    pub banner: Value,
}

/// A product as sent by listing and detail endpoints.
///
/// Listing entries only carry the summary fields; the detail endpoint adds
/// images, specifications, description and variants (`imeis`).
#[derive(Debug, Default, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub retails_price: Value,
    #[serde(default)]
    pub discount: Value,
    #[serde(default)]
    pub discount_type: Value,
    #[serde(default)]
    pub image_path: Value,
    #[serde(default)]
    pub image_url: Value,
    #[serde(default)]
    pub thumbnail: Value,
    #[serde(default)]
    pub images: Value,
    #[serde(default)]
    pub image_paths: Value,
    #[serde(default)]
    pub current_stock: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub specifications: Value,
    #[serde(default)]
    pub have_variant: Value,
    #[serde(default)]
    pub imeis: Vec<RawVariant>,
}

/// A product variant (`imeis` entry).
#[derive(Debug, Default, Deserialize)]
pub struct RawVariant {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub color: Value,
    #[serde(default)]
    pub storage: Value,
    #[serde(default)]
    pub region: Value,
    #[serde(default)]
    pub sale_price: Value,
    #[serde(default)]
    pub in_stock: Value,
}

// =============================================================================
// Scalar coercions
// =============================================================================

/// Read an integer from a number or numeric string.
#[must_use]
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .and_then(|f| format!("{f:.0}").parse().ok())
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a decimal from a number or numeric string (`"1,299.50"` allowed).
#[must_use]
pub fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Read a non-empty, trimmed string. Numbers are rendered as text.
#[must_use]
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a flag that may be `true`, `1`, `"1"` or `"yes"`.
#[must_use]
pub fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|i| i != 0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "in stock"
        ),
        _ => false,
    }
}
