//! Cart route handlers.
//!
//! Every visitor has one cart, found through the visitor id in their
//! session. Each handler returns the full cart so the client never has to
//! recompute count or subtotal.

use apple_nation_core::{
    CartLine, LineKey, MAX_UNIT_PRICE, NewCartItem, format_amount, normalize_quantity,
    parse_quantity,
};
use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::cart::CartStore;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::Visitor;
use crate::state::AppState;

/// Cart as returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    pub subtotal_display: String,
    pub hydrated: bool,
}

impl From<&CartStore> for CartView {
    fn from(store: &CartStore) -> Self {
        let subtotal = store.subtotal();
        Self {
            lines: store.lines().to_vec(),
            count: store.count(),
            subtotal,
            subtotal_display: format_amount(subtotal),
            hydrated: store.is_hydrated(),
        }
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(flatten)]
    pub item: NewCartItem,
    #[serde(default)]
    pub quantity: Option<Value>,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    #[serde(default)]
    pub quantity: Value,
}

/// Read a quantity from arbitrary JSON; anything unusable is 1.
#[must_use]
pub fn quantity_from_json(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_f64().map_or(1, normalize_quantity),
        Value::String(s) => parse_quantity(s),
        _ => 1,
    }
}

/// Current cart.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, visitor: Visitor) -> Result<Json<CartView>> {
    let view = state
        .carts()
        .with_cart(visitor.id(), |cart| CartView::from(&*cart))?;
    Ok(Json(view))
}

/// Add an item.
#[instrument(skip(state, request), fields(product_id = %request.item.id))]
pub async fn add(
    State(state): State<AppState>,
    visitor: Visitor,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let AddItemRequest { item, quantity } = request;

    if item.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if item.price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }
    if item.price > MAX_UNIT_PRICE {
        return Err(AppError::BadRequest(format!(
            "price must not exceed {MAX_UNIT_PRICE}"
        )));
    }

    let quantity = quantity.as_ref().map_or(1, quantity_from_json);
    let (key, view) = state.carts().with_cart(visitor.id(), |cart| {
        let key = cart.add_item(item, quantity);
        (key, CartView::from(&*cart))
    })?;

    add_breadcrumb(
        "cart",
        "Added item to cart",
        Some(&[("key", key.as_str()), ("quantity", &quantity.to_string())]),
    );

    Ok(Json(view))
}

/// Set a line's quantity.
#[instrument(skip(state, request))]
pub async fn update(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(key): Path<String>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let key = LineKey::from_raw(key);
    let quantity = quantity_from_json(&request.quantity);

    let view = state.carts().with_cart(visitor.id(), |cart| {
        cart.update_quantity(&key, f64::from(quantity));
        CartView::from(&*cart)
    })?;
    Ok(Json(view))
}

/// Remove a line.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(key): Path<String>,
) -> Result<Json<CartView>> {
    let key = LineKey::from_raw(key);
    let view = state.carts().with_cart(visitor.id(), |cart| {
        cart.remove_item(&key);
        CartView::from(&*cart)
    })?;
    Ok(Json(view))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(State(state): State<AppState>, visitor: Visitor) -> Result<Json<CartView>> {
    let view = state.carts().with_cart(visitor.id(), |cart| {
        cart.clear();
        CartView::from(&*cart)
    })?;
    Ok(Json(view))
}
