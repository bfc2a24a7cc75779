//! SnippetIndex trait — semantic code search over the project.
//!
//! The index is an external collaborator: the engine asks it for the
//! snippets most relevant to the user's message and injects them as
//! ephemeral context. Index failures are always swallowed — a turn never
//! fails because retrieval was unavailable.

use crate::error::RetrievalError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A retrieved code snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    /// Workspace-relative path of the source file
    pub path: String,

    /// The snippet content
    pub content: String,

    /// Relevance score (set by search; higher is more relevant)
    #[serde(default)]
    pub score: f32,
}

/// The core SnippetIndex trait.
///
/// Implementations: in-memory keyword index, no-op (retrieval disabled).
/// A real deployment would back this with a vector store.
#[async_trait]
pub trait SnippetIndex: Send + Sync {
    /// The index name (e.g., "in_memory", "noop").
    fn name(&self) -> &str;

    /// Return up to `k` snippets relevant to `query`, best first.
    async fn search(
        &self,
        query: &str,
        k: usize,
    ) -> std::result::Result<Vec<Snippet>, RetrievalError>;
}
