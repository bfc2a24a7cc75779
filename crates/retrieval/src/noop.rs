//! No-op index — retrieval disabled.

use async_trait::async_trait;
use sidekick_core::error::RetrievalError;
use sidekick_core::retrieval::{Snippet, SnippetIndex};

/// An index that never returns anything. Used when retrieval is switched
/// off or no project index has been built yet.
pub struct NoopIndex;

#[async_trait]
impl SnippetIndex for NoopIndex {
    fn name(&self) -> &str {
        "noop"
    }

    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Snippet>, RetrievalError> {
        Ok(Vec::new())
    }
}
