//! Query-time retrieval over the corpus index.

use tracing::debug;

use crate::state::AppState;
use reportsage_chat::ContextChunk;
use reportsage_store::SearchHit;

/// RRF constant for hybrid search fusion.
const RRF_K: usize = 60;

/// Retrieve the top-k chunks for a question.
///
/// Uses hybrid (BM25 + vector RRF) search when the embedder is available,
/// falling back to BM25-only otherwise or on vector-search failure.
/// Returns the retained chunks and the search type used.
pub fn retrieve(
    state: &AppState,
    query: &str,
    top_k: usize,
    min_score: f64,
) -> (Vec<ContextChunk>, &'static str) {
    let (hits, search_type) = if state.embedder.is_available() {
        match state.embedder.embed(query) {
            Some(emb) => {
                match state
                    .store
                    .hybrid_search(query, &emb.embedding, top_k, top_k, RRF_K)
                {
                    Ok(hits) => (hits, "hybrid"),
                    Err(_) => (bm25_or_empty(state, query, top_k), "bm25"),
                }
            }
            None => (bm25_or_empty(state, query, top_k), "bm25"),
        }
    } else {
        (bm25_or_empty(state, query, top_k), "bm25")
    };

    let context: Vec<ContextChunk> = hits
        .iter()
        .filter(|hit| hit.score >= min_score)
        .take(top_k)
        .map(to_context_chunk)
        .collect();

    debug!(
        "Retrieved {} chunks for query ({} search)",
        context.len(),
        search_type
    );

    (context, search_type)
}

fn bm25_or_empty(state: &AppState, query: &str, top_k: usize) -> Vec<SearchHit> {
    state.store.bm25_search(query, top_k).unwrap_or_default()
}

fn to_context_chunk(hit: &SearchHit) -> ContextChunk {
    ContextChunk {
        id: hit.chunk_id,
        text: hit.text.clone(),
        score: hit.score,
        page_label: hit.page_label.clone(),
        source: Some(hit.source.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::state::AppState;
    use reportsage_core::ReportSageConfig;
    use reportsage_infer::NoopEmbedder;
    use reportsage_store::{AddChunkOptions, IndexStore};

    fn test_state(dir: &std::path::Path) -> AppState {
        let config = ReportSageConfig::from_env(dir).unwrap();
        let store = IndexStore::open(&config.data_paths.index, config.embedding_dim).unwrap();
        AppState::new(config, store, Arc::new(NoopEmbedder::new(384)))
    }

    #[test]
    fn test_bm25_fallback_without_embedder() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(dir.path());

        let doc = state
            .store
            .add_document("annual-report.pdf", None, None)
            .unwrap();
        state
            .store
            .add_chunk(
                doc,
                "Revenue from operations grew 36% year on year",
                0,
                AddChunkOptions {
                    page_label: Some("12".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let (context, search_type) = retrieve(&state, "revenue operations", 3, 0.0);
        assert_eq!(search_type, "bm25");
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].page_label.as_deref(), Some("12"));
        assert_eq!(context[0].source.as_deref(), Some("annual-report.pdf"));
    }

    #[test]
    fn test_min_score_filters_hits() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(dir.path());

        let doc = state
            .store
            .add_document("annual-report.pdf", None, None)
            .unwrap();
        state
            .store
            .add_chunk(doc, "Dividend policy of the board", 0, Default::default())
            .unwrap();

        let (context, _) = retrieve(&state, "dividend policy", 3, f64::MAX);
        assert!(context.is_empty());
    }

    #[test]
    fn test_top_k_bounds_results() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(dir.path());

        let doc = state
            .store
            .add_document("annual-report.pdf", None, None)
            .unwrap();
        for i in 0..5 {
            state
                .store
                .add_chunk(
                    doc,
                    &format!("Segment revenue details part {}", i),
                    i,
                    Default::default(),
                )
                .unwrap();
        }

        let (context, _) = retrieve(&state, "segment revenue", 2, 0.0);
        assert_eq!(context.len(), 2);
    }
}
