//! Cart and order slot commands.
//!
//! Slots are the same files the server writes, so a cart can be inspected
//! or seeded by pointing `--data-dir` at the server's data directory and
//! `--slot` at a visitor id.

use std::path::Path;
use std::sync::Arc;

use apple_nation_core::{
    CartLine, MAX_UNIT_PRICE, NewCartItem, ProductId, VariantId, format_amount,
};
use apple_nation_storefront::cart::{
    CartStore, FileStorage, ScopedStorage, cart_slot_key, validate_key,
};
use apple_nation_storefront::checkout;
use rust_decimal::Decimal;
use serde::Serialize;

use super::print_json;

/// Cart output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary<'a> {
    pub slot: &'a str,
    pub lines: &'a [CartLine],
    pub count: u64,
    pub subtotal: String,
}

/// Open and hydrate the cart for `slot`.
///
/// # Errors
///
/// Returns an error if the slot name is not a valid key or the data
/// directory cannot be created.
pub fn open(data_dir: &Path, slot: &str) -> Result<CartStore, Box<dyn std::error::Error>> {
    validate_key(slot)?;
    let storage = FileStorage::open(data_dir)?;
    Ok(CartStore::open(cart_slot_key(slot), Arc::new(storage)))
}

#[must_use]
pub fn summary(cart: &CartStore) -> CartSummary<'_> {
    CartSummary {
        slot: cart.slot(),
        lines: cart.lines(),
        count: cart.count(),
        subtotal: format_amount(cart.subtotal()),
    }
}

/// Build an add-to-cart payload from command arguments.
#[must_use]
pub fn new_item(
    id: ProductId,
    variant: Option<VariantId>,
    name: String,
    price: Decimal,
    image: Option<String>,
    attributes: Vec<(String, String)>,
) -> NewCartItem {
    let mut item = NewCartItem::new(id, name, price);
    if let Some(variant) = variant {
        item = item.with_variant(variant);
    }
    if let Some(image) = image {
        item = item.with_image(image);
    }
    attributes
        .into_iter()
        .fold(item, |item, (name, value)| item.with_attribute(name, value))
}

/// Parse a unit price between zero and [`MAX_UNIT_PRICE`].
///
/// # Errors
///
/// Returns a message if the text is not a decimal or is out of range.
pub fn parse_price(raw: &str) -> Result<Decimal, String> {
    let price: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| format!("expected a decimal price, got {raw:?}"))?;
    if price.is_sign_negative() || price > MAX_UNIT_PRICE {
        return Err(format!("price must be between 0 and {MAX_UNIT_PRICE}"));
    }
    Ok(price)
}

/// Parse `name=value`.
///
/// # Errors
///
/// Returns a message if there is no `=` or the name is empty.
pub fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected name=value, got {raw:?}")),
    }
}

/// Print the last order placed from `slot`, or `null`.
///
/// # Errors
///
/// Returns an error if the slot name is invalid, the data directory cannot
/// be opened or output fails.
pub fn last_order(data_dir: &Path, slot: &str) -> Result<(), Box<dyn std::error::Error>> {
    validate_key(slot)?;
    let storage = ScopedStorage::new(Arc::new(FileStorage::open(data_dir)?), slot);
    let order = checkout::last_order(&storage);
    if order.is_none() {
        tracing::info!(slot, "No order found");
    }
    print_json(&order)
}
