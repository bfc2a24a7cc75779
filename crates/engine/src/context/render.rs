//! The per-request prompt view.
//!
//! Built fresh for every model call and never stored. Ephemeral context
//! (the running summary, retrieved snippets) is spliced into this copy
//! only, so repeated summarization and retrieval can't grow the
//! persisted history without bound.

use crate::context::store::ContextStore;
use sidekick_core::message::{PromptMessage, Role};
use tracing::debug;

/// Build the message list for one model call.
///
/// - The summary, when present, lands immediately after the system
///   prompt so it colors every later message.
/// - The retrieval block, when present, lands immediately before the
///   latest user message — closest to the question it supports.
pub fn render_prompt(store: &ContextStore, retrieval_block: Option<&str>) -> Vec<PromptMessage> {
    let mut messages: Vec<PromptMessage> = store
        .entries()
        .iter()
        .map(|e| PromptMessage {
            role: e.role,
            content: e.content.clone(),
        })
        .collect();

    if let Some(summary) = store.summary() {
        let splice_at = messages.len().min(1);
        messages.insert(
            splice_at,
            PromptMessage::system(format!("Previous conversation summary:\n{summary}")),
        );
    }

    if let Some(block) = retrieval_block {
        match messages.iter().rposition(|m| m.role == Role::User) {
            Some(idx) => messages.insert(idx, PromptMessage::system(block)),
            None => debug!("No user message to anchor the retrieval block, skipping"),
        }
    }

    messages
}
