//! Search route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::middleware::Visitor;
use crate::search::SearchOutcome;
use crate::state::AppState;

/// Search suggestions query parameters.
#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
    /// Client-side sequence number, echoed back so the client can drop
    /// responses to queries it has already superseded.
    #[serde(default)]
    pub seq: Option<u64>,
}

/// Search suggestions response.
#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// False while the first index build is still running.
    pub ready: bool,
    #[serde(flatten)]
    pub outcome: SearchOutcome,
}

/// Search suggestions endpoint.
///
/// Debounced per visitor: when the same visitor sends a newer query first,
/// this one answers with status `superseded` and no results.
#[instrument(skip(state, visitor))]
pub async fn suggest(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(query): Query<SuggestQuery>,
) -> Json<SuggestResponse> {
    let outcome = state.search().suggest(visitor.id(), &query.q).await;

    Json(SuggestResponse {
        query: query.q,
        seq: query.seq,
        ready: state.search().is_ready(),
        outcome,
    })
}
