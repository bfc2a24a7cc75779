//! Periodic conversation compaction.
//!
//! Every ten appended messages, the engine folds the recent exchange
//! into a short natural-language digest via one model call. The digest
//! replaces nothing — it rides along in the rendered prompt. A failed
//! summarization returns an empty digest and never blocks the turn.

use crate::context::store::ContextStore;
use sidekick_core::backend::{ModelBackend, ModelRequest};
use sidekick_core::message::{PromptMessage, Role};
use tracing::{debug, warn};

/// How many trailing entries feed the digest.
const DIGEST_WINDOW: usize = 10;

/// Cap per-entry content in the digest prompt.
const DIGEST_ENTRY_CHARS: usize = 500;

/// Produce a digest of the last ten non-system entries.
///
/// Returns an empty string when there is nothing to summarize or the
/// model call fails — the caller leaves the stored summary unchanged in
/// that case.
pub async fn generate_digest(
    store: &ContextStore,
    backend: &dyn ModelBackend,
    model: &str,
) -> String {
    let recent: Vec<_> = store
        .entries()
        .iter()
        .filter(|e| e.role != Role::System)
        .rev()
        .take(DIGEST_WINDOW)
        .collect();

    if recent.is_empty() {
        return String::new();
    }

    let mut transcript = String::new();
    for entry in recent.iter().rev() {
        let speaker = match entry.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => continue,
        };
        let content: String = entry.content.chars().take(DIGEST_ENTRY_CHARS).collect();
        transcript.push_str(&format!("{speaker}: {content}\n\n"));
    }

    let prompt = format!(
        "Summarize the conversation below concisely. State only the key \
         points and the actions that were taken. Use at most 5 sentences.\n\n\
         Conversation:\n{transcript}\
         Summary (at most 5 sentences):"
    );

    let request = ModelRequest::new(model, vec![PromptMessage::user(prompt)]);

    match backend.complete(request).await {
        Ok(reply) => {
            let digest = reply.text.trim().to_string();
            debug!(chars = digest.len(), "Conversation digest generated");
            digest
        }
        Err(e) => {
            warn!("Summarization failed, continuing without a digest: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingBackend, SequentialMockBackend};

    fn filled_store() -> ContextStore {
        let mut store = ContextStore::new(32_768, 8_192);
        store.set_system_prompt("sys");
        for i in 0..12 {
            store.append(Role::User, format!("question {i}"));
            store.append(Role::Assistant, format!("answer {i}"));
        }
        store
    }

    #[tokio::test]
    async fn digest_uses_recent_window_only() {
        let backend = SequentialMockBackend::single_text("A tidy digest.");
        let digest = generate_digest(&filled_store(), &backend, "m").await;
        assert_eq!(digest, "A tidy digest.");

        let request = backend.requests()[0].clone();
        let prompt = &request.messages[0].content;
        // The last ten entries cover questions/answers 7..=11
        assert!(prompt.contains("answer 11"));
        assert!(prompt.contains("question 7"));
        assert!(!prompt.contains("question 5"));
    }

    #[tokio::test]
    async fn digest_prompt_excludes_system_entries() {
        let backend = SequentialMockBackend::single_text("digest");
        let _ = generate_digest(&filled_store(), &backend, "m").await;
        let prompt = backend.requests()[0].messages[0].content.clone();
        assert!(!prompt.contains("sys"));
    }

    #[tokio::test]
    async fn long_entries_are_truncated() {
        let mut store = ContextStore::new(32_768, 8_192);
        store.set_system_prompt("sys");
        store.append(Role::User, "x".repeat(5_000));

        let backend = SequentialMockBackend::single_text("digest");
        let _ = generate_digest(&store, &backend, "m").await;
        let prompt = backend.requests()[0].messages[0].content.clone();
        // 500 chars of content plus the prompt scaffolding
        assert!(prompt.len() < 1_200);
    }

    #[tokio::test]
    async fn failure_returns_empty_digest() {
        let backend = FailingBackend::unreachable();
        let digest = generate_digest(&filled_store(), &backend, "m").await;
        assert!(digest.is_empty());
    }

    #[tokio::test]
    async fn empty_history_returns_empty_digest() {
        let mut store = ContextStore::new(32_768, 8_192);
        store.set_system_prompt("sys");
        let backend = SequentialMockBackend::single_text("never called");
        let digest = generate_digest(&store, &backend, "m").await;
        assert!(digest.is_empty());
        assert_eq!(backend.call_count(), 0);
    }
}
