//! Retrieval-only search route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::retrieval::retrieve;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/search", post(search))
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "default_top_k", rename = "topK")]
    top_k: usize,
    #[serde(default, rename = "minScore")]
    min_score: f64,
}

fn default_top_k() -> usize {
    10
}

/// POST /api/search — ranked chunks for a query, no generation.
async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Json<serde_json::Value> {
    let (results, search_type) = retrieve(&state, &req.query, req.top_k, req.min_score);

    Json(serde_json::json!({
        "results": results,
        "total": results.len(),
        "query": req.query,
        "searchType": search_type,
    }))
}
