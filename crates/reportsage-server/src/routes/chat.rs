//! Chat routes — RAG question answering with hosted LLM streaming.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use tokio_stream::StreamExt;

use crate::retrieval::retrieve;
use crate::state::AppState;
use reportsage_chat::answer::{compose_answer, format_sources, is_refusal};
use reportsage_chat::config::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use reportsage_chat::prompt::build_messages;
use reportsage_chat::providers::{self, StreamChunk};
use reportsage_chat::types::*;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// The one user-visible failure message for a chat turn. Provider and stream
/// errors are logged but not differentiated to the client.
const GENERATION_ERROR: &str = "Failed to generate an answer. Please try again.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/status", get(get_status))
        .route("/chat", post(chat))
        .route("/chat/stream", post(stream_chat))
        .route("/chat/config", get(get_config).put(update_config))
        .route("/chat/config/test", post(test_key))
}

// ---------------------------------------------------------------
// Status
// ---------------------------------------------------------------

async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.llm_config.read();
    let resolved = config.resolve_provider();
    let index_stats = state.store.stats().ok();

    Json(serde_json::json!({
        "llmAvailable": resolved.is_some(),
        "llmProvider": resolved.as_ref().map(|(p, _, _)| p.to_string()),
        "defaultModel": resolved.as_ref().map(|(_, m, _)| m.clone()),
        "availableModels": config.available_models(),
        "indexAvailable": index_stats.is_some(),
        "embedderAvailable": state.embedder.is_available(),
        "corpus": state.config.corpus_label,
    }))
}

// ---------------------------------------------------------------
// Non-streaming chat (one synchronous turn)
// ---------------------------------------------------------------

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let start = Instant::now();

    let (provider, model, api_key) = {
        let config = state.llm_config.read();
        match config.resolve_provider() {
            Some(resolved) => resolved,
            None => {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "error": "No LLM provider configured",
                    })),
                );
            }
        }
    };

    // Session history snapshot predates this turn's user message
    let session_id = state.sessions.get_or_create(req.session_id.as_deref());
    let history = state.sessions.history(&session_id);
    state
        .sessions
        .append(&session_id, ChatMessage::user(&req.message));

    let (context, search_type) = retrieve(&state, &req.message, req.top_k, req.min_score);

    let messages = build_messages(&state.config.corpus_label, &context, &history, &req.message);

    let temperature = req.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    let max_tokens = req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

    tracing::info!(
        "Chat turn: provider={} model={} context={} ({})",
        provider,
        model,
        context.len(),
        search_type
    );

    // Collect all tokens (non-streaming)
    let stream = providers::stream_llm(
        &state.http_client,
        provider,
        messages,
        &model,
        &api_key,
        temperature,
        max_tokens,
    );

    tokio::pin!(stream);

    let mut answer = String::new();
    let mut tokens_used = 0;

    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(text) => {
                answer.push_str(&text);
            }
            StreamChunk::Done { tokens_used: t } => {
                tokens_used = t;
            }
            StreamChunk::Error(e) => {
                tracing::error!("Generation failed: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": GENERATION_ERROR })),
                );
            }
        }
    }

    let composed = compose_answer(&answer, &context, &state.config.corpus_label);
    state
        .sessions
        .append(&session_id, ChatMessage::assistant(&composed));

    let duration = start.elapsed().as_millis() as u64;

    let response = ChatResponse {
        message: composed,
        model,
        session_id,
        sources: if context.is_empty() {
            None
        } else {
            Some(context)
        },
        tokens_used: Some(tokens_used),
        duration: Some(duration),
    };

    (
        StatusCode::OK,
        Json(serde_json::to_value(response).unwrap()),
    )
}

// ---------------------------------------------------------------
// Streaming chat (SSE)
// ---------------------------------------------------------------

async fn stream_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Sse<SseStream> {
    let start = Instant::now();

    let resolved = {
        let config = state.llm_config.read();
        config.resolve_provider()
    };

    let (provider, model, api_key) = match resolved {
        Some(r) => r,
        None => {
            let error_stream: SseStream = Box::pin(async_stream::stream! {
                let event = StreamEvent::Error {
                    error: "No LLM provider configured".into(),
                };
                yield Ok::<_, Infallible>(Event::default().data(
                    serde_json::to_string(&event).unwrap()
                ));
            });
            return Sse::new(error_stream);
        }
    };

    let session_id = state.sessions.get_or_create(req.session_id.as_deref());
    let history = state.sessions.history(&session_id);
    state
        .sessions
        .append(&session_id, ChatMessage::user(&req.message));

    let (context, _search_type) = retrieve(&state, &req.message, req.top_k, req.min_score);

    let messages = build_messages(&state.config.corpus_label, &context, &history, &req.message);

    let temperature = req.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    let max_tokens = req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

    let llm_stream = providers::stream_llm(
        &state.http_client,
        provider,
        messages,
        &model,
        &api_key,
        temperature,
        max_tokens,
    );

    let model_clone = model.clone();
    let state_clone = state.clone();

    let sse_stream: SseStream = Box::pin(async_stream::stream! {
        // First: emit context event
        if !context.is_empty() {
            let event = StreamEvent::Context { context: context.clone() };
            yield Ok::<_, Infallible>(Event::default().data(
                serde_json::to_string(&event).unwrap()
            ));
        }

        // Stream tokens from the LLM, accumulating the answer for the
        // relevance check and the session history
        let mut answer = String::new();

        tokio::pin!(llm_stream);
        while let Some(chunk) = llm_stream.next().await {
            match chunk {
                StreamChunk::Token(text) => {
                    answer.push_str(&text);
                    let event = StreamEvent::Token { content: text };
                    yield Ok(Event::default().data(
                        serde_json::to_string(&event).unwrap()
                    ));
                }
                StreamChunk::Done { tokens_used } => {
                    // Citations only when the full answer was judged relevant
                    let corpus = &state_clone.config.corpus_label;
                    if !context.is_empty() && !is_refusal(&answer, corpus) {
                        let event = StreamEvent::Sources {
                            content: format!("Source Documents:\n{}", format_sources(&context)),
                        };
                        yield Ok(Event::default().data(
                            serde_json::to_string(&event).unwrap()
                        ));
                    }

                    let composed = compose_answer(&answer, &context, corpus);
                    state_clone
                        .sessions
                        .append(&session_id, ChatMessage::assistant(&composed));

                    let duration = start.elapsed().as_millis() as u64;
                    let event = StreamEvent::Done {
                        model: model_clone.clone(),
                        tokens_used,
                        duration,
                    };
                    yield Ok(Event::default().data(
                        serde_json::to_string(&event).unwrap()
                    ));
                    // Final [DONE] marker
                    yield Ok(Event::default().data("[DONE]".to_string()));
                    return;
                }
                StreamChunk::Error(e) => {
                    tracing::error!("Generation failed: {}", e);
                    let event = StreamEvent::Error { error: GENERATION_ERROR.into() };
                    yield Ok(Event::default().data(
                        serde_json::to_string(&event).unwrap()
                    ));
                    return;
                }
            }
        }
    });

    Sse::new(sse_stream)
}

// ---------------------------------------------------------------
// Config
// ---------------------------------------------------------------

async fn get_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.llm_config.read();
    Json(serde_json::to_value(config.to_response()).unwrap())
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LLMConfigUpdate>,
) -> impl IntoResponse {
    let mut config = state.llm_config.write();
    config.apply_update(&update);

    if let Err(e) = config.save() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("Failed to save config: {}", e) })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::to_value(config.to_response()).unwrap()),
    )
}

async fn test_key(Json(req): Json<TestKeyRequest>) -> impl IntoResponse {
    match providers::test_api_key(&req.provider, &req.api_key).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true })),
        ),
        Err(e) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": false, "error": e })),
        ),
    }
}
