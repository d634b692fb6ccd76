//! HTTP route handlers for storefront.
//!
//! All endpoints speak JSON; page rendering belongs to the client.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness check
//! GET    /health/ready                  - 200 once the search index is built, else 503
//!
//! # Cart
//! GET    /api/cart                      - Current cart
//! POST   /api/cart/items                - Add item
//! PATCH  /api/cart/items/{key}          - Set quantity
//! DELETE /api/cart/items/{key}          - Remove line
//! DELETE /api/cart                      - Clear cart
//!
//! # Search
//! GET    /api/search/suggest?q=&seq=    - Search suggestions
//!
//! # Catalog
//! GET    /api/categories                - Categories
//! GET    /api/categories/{id}/products  - Category listing (?page=)
//! GET    /api/products                  - Filtered listing (?category=&price=&sort=&search=&page=)
//! GET    /api/products/{id}             - Product detail
//!
//! # Checkout
//! POST   /api/checkout                  - Place order
//! GET    /api/checkout/last-order       - Last placed order
//! ```

pub mod cart;
pub mod checkout;
pub mod products;
pub mod search;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};

use crate::search::SearchStatus;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{key}", patch(cart::update).delete(cart::remove))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(products::categories))
        .route(
            "/api/categories/{id}/products",
            get(products::category_products),
        )
        .route("/api/products", get(products::listing))
        .route("/api/products/{id}", get(products::show))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::place))
        .route("/last-order", get(checkout::last_order))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/cart", cart_routes())
        .route("/api/search/suggest", get(search::suggest))
        .merge(catalog_routes())
        .nest("/api/checkout", checkout_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the first search index build has
/// produced an index.
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<SearchStatus>) {
    let status = state.search().status();
    let code = if status.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
