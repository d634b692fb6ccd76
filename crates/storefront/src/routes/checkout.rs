//! Checkout route handlers.

use apple_nation_core::{CustomerDetails, Order};
use axum::{Json, extract::State};
use tracing::instrument;

use crate::checkout;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::Visitor;
use crate::state::AppState;

/// Place an order for the visitor's cart.
#[instrument(skip(state, customer))]
pub async fn place(
    State(state): State<AppState>,
    visitor: Visitor,
    Json(customer): Json<CustomerDetails>,
) -> Result<Json<Order>> {
    let orders = state.visitor_storage(visitor.id());

    let order = state.carts().with_cart(visitor.id(), |cart| {
        checkout::place_order(customer, cart, &orders, state.clock())
    })??;

    add_breadcrumb(
        "checkout",
        "Placed order",
        Some(&[("order_id", order.id.as_str())]),
    );

    Ok(Json(order))
}

/// The visitor's last placed order.
#[instrument(skip(state))]
pub async fn last_order(State(state): State<AppState>, visitor: Visitor) -> Result<Json<Order>> {
    checkout::last_order(&state.visitor_storage(visitor.id()))
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no order placed yet".to_string()))
}
