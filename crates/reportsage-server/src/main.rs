//! ReportSage — single-binary RAG question-answering server over a
//! pre-indexed document corpus.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod retrieval;
mod routes;
mod sessions;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("REPORTSAGE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = reportsage_core::ReportSageConfig::from_env(&data_dir)?;
    let port = config.port;

    // Open the pre-built index once; it is shared for the life of the process.
    let store = reportsage_store::IndexStore::open(&config.data_paths.index, config.embedding_dim)
        .map_err(|e| anyhow::anyhow!("Failed to open index: {}", e))?;

    match store.stats() {
        Ok(stats) => info!(
            "Corpus index: {} documents, {} chunks, {} embeddings",
            stats.total_documents, stats.total_chunks, stats.embeddings_stored
        ),
        Err(e) => info!("Corpus index stats unavailable: {}", e),
    }

    // Question embedder (ONNX if model files are present, BM25-only otherwise)
    let embedder = reportsage_infer::create_embedder(&config.data_paths.models);

    let state = Arc::new(AppState::new(config, store, embedder));

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("ReportSage server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
