//! Cart line items and the pure cart list.
//!
//! The cart is a list of [`CartLine`]s with at most one line per
//! [`LineKey`]. Line snapshots (name, price, image, attributes) are taken on
//! the first add and never overwritten, so a catalog price change cannot
//! silently alter a line that is already in the cart.
//!
//! The JSON shape of a line is the persisted slot format:
//!
//! ```json
//! {"key":"12:7","id":12,"variantId":7,"name":"iPhone 15","price":129999.0,
//!  "image":"/globe.svg","attributes":{"color":"Black"},"quantity":1}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, VariantId};

/// Image used when a product has no image of its own.
pub const PLACEHOLDER_IMAGE: &str = "/globe.svg";

/// Most units a single line can hold.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Highest unit price accepted from a client.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Descriptive attributes of a line (color, storage, region, ...).
pub type Attributes = BTreeMap<String, String>;

/// Stable identity of a cart line.
///
/// `"{product}"` for plain products, `"{product}:{variant}"` when a variant
/// was chosen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineKey(String);

impl LineKey {
    /// Compute the key for a product and optional variant.
    #[must_use]
    pub fn for_product(id: ProductId, variant_id: Option<VariantId>) -> Self {
        match variant_id {
            Some(variant) => Self(format!("{id}:{variant}")),
            None => Self(id.to_string()),
        }
    }

    /// Wrap an already-computed key (e.g. from a URL path).
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload for adding a product to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub attributes: Option<Attributes>,
}

impl NewCartItem {
    /// Minimal payload: product id, display name and unit price.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            variant_id: None,
            name: name.into(),
            price,
            image: None,
            attributes: None,
        }
    }

    #[must_use]
    pub const fn with_variant(mut self, variant_id: VariantId) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(Attributes::new)
            .insert(name.into(), value.into());
        self
    }

    /// The key the resulting line will have.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::for_product(self.id, self.variant_id)
    }
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub key: LineKey,
    pub id: ProductId,
    pub variant_id: Option<VariantId>,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: String,
    pub attributes: Option<Attributes>,
    pub quantity: u32,
}

impl CartLine {
    /// Snapshot a payload into a new line.
    fn from_payload(item: NewCartItem, quantity: u32) -> Self {
        let key = item.key();
        let price = item.price.max(Decimal::ZERO);
        Self {
            key,
            id: item.id,
            variant_id: item.variant_id,
            name: item.name,
            price,
            image: item
                .image
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            attributes: item.attributes.filter(|attrs| !attrs.is_empty()),
            quantity: quantity.max(1),
        }
    }

    /// `quantity × price` for this line, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Normalize a requested quantity: rounded, between 1 and
/// [`MAX_LINE_QUANTITY`], non-finite → 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to line range first
pub fn normalize_quantity(quantity: f64) -> u32 {
    if !quantity.is_finite() {
        return 1;
    }
    let rounded = quantity.round();
    if rounded < 1.0 {
        1
    } else if rounded >= f64::from(MAX_LINE_QUANTITY) {
        MAX_LINE_QUANTITY
    } else {
        rounded as u32
    }
}

fn clamp_quantity(quantity: u32) -> u32 {
    quantity.clamp(1, MAX_LINE_QUANTITY)
}

/// Parse free-form quantity input; anything non-numeric becomes 1.
#[must_use]
pub fn parse_quantity(input: &str) -> u32 {
    input
        .trim()
        .parse::<f64>()
        .map_or(1, normalize_quantity)
}

/// The ordered list of cart lines, most recently added first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from persisted lines.
    ///
    /// Lines with a duplicate key are merged into the first occurrence and
    /// zero quantities are raised to 1, so a hand-edited slot cannot break
    /// the one-line-per-key invariant.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for mut line in lines {
            line.quantity = clamp_quantity(line.quantity);
            if let Some(existing) = cart.line_mut(&line.key) {
                existing.quantity = clamp_quantity(existing.quantity.saturating_add(line.quantity));
            } else {
                cart.lines.push(line);
            }
        }
        cart
    }

    /// Add `quantity` of an item. Returns the key of the affected line.
    ///
    /// An existing line keeps its snapshot and only gains quantity, up to
    /// [`MAX_LINE_QUANTITY`]; a new line goes to the front of the list.
    pub fn add(&mut self, item: NewCartItem, quantity: u32) -> LineKey {
        let key = item.key();
        let quantity = clamp_quantity(quantity);

        if let Some(existing) = self.line_mut(&key) {
            existing.quantity = clamp_quantity(existing.quantity.saturating_add(quantity));
        } else {
            self.lines.insert(0, CartLine::from_payload(item, quantity));
        }
        key
    }

    /// Remove the line with `key`. Returns whether a line was removed.
    pub fn remove(&mut self, key: &LineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.key != key);
        self.lines.len() != before
    }

    /// Set the quantity of `key` (normalized). Returns whether a line matched.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: f64) -> bool {
        match self.line_mut(key) {
            Some(line) => {
                line.quantity = normalize_quantity(quantity);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.key == key)
    }

    fn line_mut(&mut self, key: &LineKey) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| &line.key == key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `quantity × price` across all lines, saturating at
    /// `Decimal::MAX`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}
