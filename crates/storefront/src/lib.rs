//! Apple Nation Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused by the server binary and the CLI.
//!
//! - [`cart`]: per-visitor carts persisted to storage slots
//! - [`search`]: product name search over an index built from the catalog
//! - [`catalog`]: the catalog API client and payload normalization
//! - [`listing`]: the filtered and sorted products page
//! - [`checkout`]: form validation and order snapshots
//! - [`routes`]: the JSON HTTP surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod error;
pub mod listing;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    routes::routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
}
