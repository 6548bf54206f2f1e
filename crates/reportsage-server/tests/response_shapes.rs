//! Response-shape tests — validates that API payloads keep the field names
//! and types chat clients rely on.

use reportsage_chat::types::{ChatResponse, ContextChunk, StreamEvent};

fn sample_chunk() -> ContextChunk {
    ContextChunk {
        id: 42,
        text: "Revenue from operations grew 36% year on year.".into(),
        score: 0.85,
        page_label: Some("12".into()),
        source: Some("annual-report.pdf".into()),
    }
}

/// ChatResponse serializes with the camelCase fields the client reads:
/// { message, model, sessionId, sources, tokensUsed, duration }
#[test]
fn test_chat_response_shape() {
    let response = ChatResponse {
        message: "Answer:\nRevenue grew 36%.\n\nSource Documents:\n1. Page 12 - annual-report.pdf"
            .into(),
        model: "meta-llama/llama-4-maverick-17b-128e-instruct".into(),
        session_id: "session-1".into(),
        sources: Some(vec![sample_chunk()]),
        tokens_used: Some(128),
        duration: Some(900),
    };

    let json = serde_json::to_value(&response).unwrap();
    assert!(json["message"].is_string());
    assert!(json["model"].is_string());
    assert!(json["sessionId"].is_string());
    assert!(json["sources"].is_array());
    assert!(json["tokensUsed"].is_number());
    assert!(json["duration"].is_number());

    let source = &json["sources"][0];
    assert!(source["id"].is_number());
    assert!(source["text"].is_string());
    assert!(source["score"].is_number());
    assert_eq!(source["pageLabel"], "12");
    assert_eq!(source["source"], "annual-report.pdf");
}

/// Optional fields are omitted, not null, when absent.
#[test]
fn test_chat_response_omits_empty_fields() {
    let response = ChatResponse {
        message: "Answer:\nI don't know.".into(),
        model: "meta-llama/llama-4-maverick-17b-128e-instruct".into(),
        session_id: "session-1".into(),
        sources: None,
        tokens_used: None,
        duration: None,
    };

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("sources").is_none());
    assert!(json.get("tokensUsed").is_none());
}

/// SSE events are tagged with a `type` discriminator the client switches on.
#[test]
fn test_stream_event_tags() {
    let context = StreamEvent::Context {
        context: vec![sample_chunk()],
    };
    let token = StreamEvent::Token {
        content: "Revenue".into(),
    };
    let sources = StreamEvent::Sources {
        content: "Source Documents:\n1. Page 12 - annual-report.pdf".into(),
    };
    let done = StreamEvent::Done {
        model: "meta-llama/llama-4-maverick-17b-128e-instruct".into(),
        tokens_used: 64,
        duration: 1200,
    };
    let error = StreamEvent::Error {
        error: "Failed to generate an answer. Please try again.".into(),
    };

    assert_eq!(serde_json::to_value(&context).unwrap()["type"], "context");
    assert_eq!(serde_json::to_value(&token).unwrap()["type"], "token");
    assert_eq!(serde_json::to_value(&sources).unwrap()["type"], "sources");

    let done_json = serde_json::to_value(&done).unwrap();
    assert_eq!(done_json["type"], "done");
    assert!(done_json["tokensUsed"].is_number());
    assert!(done_json["duration"].is_number());

    assert_eq!(serde_json::to_value(&error).unwrap()["type"], "error");
}

/// Search response shape: { results, total, query, searchType }.
#[test]
fn test_search_response_shape() {
    let response = serde_json::json!({
        "results": [serde_json::to_value(sample_chunk()).unwrap()],
        "total": 1,
        "query": "revenue growth",
        "searchType": "hybrid",
    });

    assert!(response["results"].is_array());
    assert!(response["total"].is_number());
    assert!(response["query"].is_string());
    assert!(response["searchType"].is_string());
}

/// Stats response shape used by dashboards.
#[test]
fn test_stats_response_shape() {
    let stats = serde_json::json!({
        "corpus": "the Swiggy annual report",
        "documents": 1,
        "chunks": 412,
        "embeddings": 412,
        "embeddingDimension": 384,
        "dbSizeMb": 6.4,
        "matrixLoaded": true,
        "matrixRows": 412,
    });

    assert!(stats["corpus"].is_string());
    assert!(stats["documents"].is_number());
    assert!(stats["chunks"].is_number());
    assert!(stats["embeddings"].is_number());
    assert!(stats["embeddingDimension"].is_number());
    assert!(stats["dbSizeMb"].is_number());
}

/// Session listing shape: { sessions: [{ id, createdAt, messageCount, preview }] }.
#[test]
fn test_session_list_shape() {
    let listing = serde_json::json!({
        "sessions": [
            {
                "id": "7c2a4a8e",
                "createdAt": "2025-04-01T10:00:00Z",
                "messageCount": 4,
                "preview": "What was the revenue this year?",
            }
        ]
    });

    let session = &listing["sessions"][0];
    assert!(session["id"].is_string());
    assert!(session["createdAt"].is_string());
    assert!(session["messageCount"].is_number());
}
