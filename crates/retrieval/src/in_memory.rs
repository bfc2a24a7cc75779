//! In-memory keyword index — useful for testing and small workspaces.

use async_trait::async_trait;
use sidekick_core::error::RetrievalError;
use sidekick_core::retrieval::{Snippet, SnippetIndex};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A document registered with the index.
#[derive(Debug, Clone)]
struct Document {
    path: String,
    content: String,
}

/// An index that stores documents in a Vec and scores them by keyword
/// occurrence. The host (editor shell, CLI) registers files as they are
/// opened or indexed.
pub struct InMemoryIndex {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register or replace a document.
    pub async fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let mut docs = self.documents.write().await;
        docs.retain(|d| d.path != path);
        docs.push(Document {
            path,
            content: content.into(),
        });
    }

    /// Number of registered documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Keyword relevance: term occurrences normalized by document length,
    /// so short focused files outrank long ones with incidental matches.
    fn score(content: &str, terms: &[String]) -> f32 {
        let lower = content.to_lowercase();
        let matches: usize = terms.iter().map(|t| lower.matches(t.as_str()).count()).sum();
        matches as f32 / (content.len() as f32 / 100.0).max(1.0)
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnippetIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<Snippet>, RetrievalError> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() > 1)
            .map(String::from)
            .collect();

        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self.documents.read().await;
        let mut results: Vec<Snippet> = docs
            .iter()
            .filter_map(|d| {
                let score = Self::score(&d.content, &terms);
                (score > 0.0).then(|| Snippet {
                    path: d.path.clone(),
                    content: d.content.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn indexed() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        index
            .insert("src/auth.rs", "fn login(user: &str) { validate_token(user) }")
            .await;
        index
            .insert("src/db.rs", "fn connect() -> Pool { Pool::new() }")
            .await;
        index
            .insert(
                "src/token.rs",
                "fn validate_token(raw: &str) -> bool { raw.starts_with(\"tok_\") }",
            )
            .await;
        index
    }

    #[tokio::test]
    async fn search_finds_relevant_documents() {
        let index = indexed().await;
        let results = index.search("validate_token", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        let paths: Vec<&str> = results.iter().map(|s| s.path.as_str()).collect();
        assert!(paths.contains(&"src/auth.rs"));
        assert!(paths.contains(&"src/token.rs"));
    }

    #[tokio::test]
    async fn results_are_capped_at_k() {
        let index = indexed().await;
        let results = index.search("fn", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn no_match_returns_empty() {
        let index = indexed().await;
        let results = index.search("kubernetes", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn insert_replaces_same_path() {
        let index = InMemoryIndex::new();
        index.insert("a.rs", "first version").await;
        index.insert("a.rs", "second version").await;
        assert_eq!(index.len().await, 1);

        let results = index.search("second", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("second"));
    }

    #[tokio::test]
    async fn short_query_terms_are_ignored() {
        let index = indexed().await;
        // Single-char terms carry no signal
        let results = index.search("a b c", 5).await.unwrap();
        assert!(results.is_empty());
    }
}
