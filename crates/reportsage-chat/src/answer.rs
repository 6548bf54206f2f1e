//! Answer composition: source previews and the out-of-scope refusal check.

use crate::prompt::refusal_phrase;
use crate::types::ContextChunk;

/// Maximum preview length for a cited source excerpt.
pub const PREVIEW_MAX_CHARS: usize = 300;

/// Answers containing any of these substrings are treated as refusals and
/// shown without source citations. A plain substring match, not a classifier.
const REFUSAL_MARKERS: &[&str] = &["i don't know", "not relevant"];

/// Collapse newlines and truncate at a sentence boundary.
///
/// Text within `max_chars` passes through cleaned. Longer text is cut at the
/// last sentence-ending period inside the limit, or at the limit with a
/// trailing ellipsis when no period exists in range.
pub fn text_preview(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").trim().to_string();
    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }

    let preview: String = cleaned.chars().take(max_chars).collect();
    match preview.rfind('.') {
        Some(pos) => preview[..=pos].to_string(),
        None => format!("{}...", preview),
    }
}

/// Decide whether a generated answer is an out-of-scope refusal.
///
/// Checks for the stock refusal markers and the corpus-specific phrase the
/// system prompt instructs the model to use. Matching is case-insensitive.
pub fn is_refusal(answer: &str, corpus_label: &str) -> bool {
    let lowered = answer.to_lowercase();
    REFUSAL_MARKERS.iter().any(|m| lowered.contains(m))
        || lowered.contains(&refusal_phrase(corpus_label).to_lowercase())
}

/// Format retrieved chunks as a numbered citation block.
pub fn format_sources(context: &[ContextChunk]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let page = c.page_label.as_deref().unwrap_or("N/A");
            let source = c.source.as_deref().unwrap_or("N/A");
            format!(
                "{}. Page {} - {}\n   {}",
                i + 1,
                page,
                source,
                text_preview(&c.text, PREVIEW_MAX_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compose the display string for one chat turn: the answer, plus the source
/// citations whenever the answer is relevant and at least one chunk was
/// retrieved.
pub fn compose_answer(answer: &str, context: &[ContextChunk], corpus_label: &str) -> String {
    if context.is_empty() || is_refusal(answer, corpus_label) {
        format!("Answer:\n{}", answer)
    } else {
        format!(
            "Answer:\n{}\n\nSource Documents:\n{}",
            answer,
            format_sources(context)
        )
    }
}
