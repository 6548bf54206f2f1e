//! Prompt construction for corpus-grounded answers.

use crate::types::{ChatMessage, ContextChunk};

/// The refusal sentence the model is told to use for out-of-scope questions.
/// `answer::is_refusal` matches against the same wording.
pub fn refusal_phrase(corpus_label: &str) -> String {
    format!("help with questions about {}", corpus_label)
}

/// Build the message array for the LLM: a system prompt carrying the numbered
/// context excerpts, the prior conversation, then the current question.
pub fn build_messages(
    corpus_label: &str,
    context: &[ContextChunk],
    conversation_history: &[ChatMessage],
    user_message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(conversation_history.len() + 2);

    messages.push(ChatMessage {
        role: "system".into(),
        content: system_prompt(corpus_label, context),
    });

    for msg in conversation_history {
        messages.push(msg.clone());
    }

    messages.push(ChatMessage::user(user_message));

    messages
}

fn system_prompt(corpus_label: &str, context: &[ContextChunk]) -> String {
    let context_str: String = context
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let location = match (&c.page_label, &c.source) {
                (Some(page), Some(source)) => format!(" (Page {}, {})", page, source),
                (Some(page), None) => format!(" (Page {})", page),
                (None, Some(source)) => format!(" ({})", source),
                (None, None) => String::new(),
            };
            format!("[{}]{}: {}", i + 1, location, c.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Use the pieces of information provided in the context to answer the \
         user's question. Answer only from the context. \
         If the question is not relevant to the provided context, politely say \
         that you can only {} and nothing else.\n\n\
         Context:\n{}",
        refusal_phrase(corpus_label),
        context_str
    )
}
