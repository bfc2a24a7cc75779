//! Retrieval augmentation — ephemeral project context per turn.
//!
//! Fetches the snippets most relevant to the user's message and formats
//! them as a single system block for the rendered prompt. The index is
//! best-effort: any failure is swallowed and the turn proceeds without
//! augmentation.

use sidekick_core::retrieval::SnippetIndex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cap per-snippet content injected into the prompt.
const SNIPPET_CHARS: usize = 1_500;

/// Fetches and formats retrieval context.
pub struct Augmentor {
    index: Arc<dyn SnippetIndex>,
    top_k: usize,
}

impl Augmentor {
    pub fn new(index: Arc<dyn SnippetIndex>, top_k: usize) -> Self {
        Self { index, top_k }
    }

    /// Fetch snippets for `query` and render them as one system block.
    ///
    /// Returns `None` when nothing relevant was found or the index
    /// failed — the caller simply skips augmentation.
    pub async fn fetch_block(&self, query: &str) -> Option<String> {
        let snippets = match self.index.search(query, self.top_k).await {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!(index = self.index.name(), "Retrieval failed, skipping augmentation: {e}");
                return None;
            }
        };

        if snippets.is_empty() {
            return None;
        }

        debug!(count = snippets.len(), "Retrieved project snippets");

        let mut block = String::from(
            "## Project memory (semantic search)\n\n\
             These snippets come from the project's code base. Treat these \
             files as existing with the given contents when answering.\n\n",
        );

        for snippet in &snippets {
            let content: String = snippet.content.chars().take(SNIPPET_CHARS).collect();
            block.push_str(&format!("--- FILE: {} ---\n```\n{}\n```\n\n", snippet.path, content));
        }

        Some(block)
    }
}
