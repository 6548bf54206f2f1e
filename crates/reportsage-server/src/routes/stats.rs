//! Index stats and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/health", get(get_health))
}

/// GET /api/stats — corpus index statistics.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.store.stats().unwrap_or_else(|_| reportsage_store::StoreStats {
        total_documents: 0,
        total_chunks: 0,
        embeddings_stored: 0,
        embedding_dimension: state.config.embedding_dim,
        db_path: String::new(),
        db_size_mb: 0.0,
        matrix_loaded: false,
        matrix_rows: 0,
    });

    Json(serde_json::json!({
        "corpus": state.config.corpus_label,
        "documents": stats.total_documents,
        "chunks": stats.total_chunks,
        "embeddings": stats.embeddings_stored,
        "embeddingDimension": stats.embedding_dimension,
        "dbSizeMb": stats.db_size_mb,
        "matrixLoaded": stats.matrix_loaded,
        "matrixRows": stats.matrix_rows,
    }))
}

/// GET /api/health — liveness plus a coarse index summary.
async fn get_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.store.stats().ok();
    Json(serde_json::json!({
        "status": "healthy",
        "service": "reportsage",
        "documents": stats.as_ref().map(|s| s.total_documents).unwrap_or(0),
        "chunks": stats.as_ref().map(|s| s.total_chunks).unwrap_or(0),
        "embeddings": stats.as_ref().map(|s| s.embeddings_stored).unwrap_or(0),
    }))
}
