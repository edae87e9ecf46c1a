//! Query-time retrieval over a [`SimilarityIndex`].

use crate::embeddings::EmbeddingProvider;
use crate::index::SimilarityIndex;
use crate::types::{EmbeddingVector, RetrievedMatch};
use statute_core::config::RetrievalConfig;
use statute_core::{with_retries, AppError, AppResult, RetryPolicy};
use std::sync::Arc;

/// Embeds queries and looks them up in the shared index.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<SimilarityIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    retry: RetryPolicy,
}

impl Retriever {
    pub fn new(
        index: Arc<SimilarityIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            index,
            embedder,
            config,
            retry,
        }
    }

    /// Number of matches returned when the caller does not ask for a count.
    pub fn default_k(&self) -> usize {
        self.config.top_k
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Reject empty or oversized queries.
    pub fn validate_query(&self, query: &str) -> AppResult<()> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("Query must not be empty".to_string()));
        }

        let length = query.chars().count();
        if length > self.config.max_query_chars {
            return Err(AppError::Validation(format!(
                "Query is {} characters long; the limit is {}",
                length, self.config.max_query_chars
            )));
        }

        Ok(())
    }

    /// Reject a per-query match count of zero.
    pub fn validate_k(k: usize) -> AppResult<usize> {
        if k == 0 {
            return Err(AppError::Validation(
                "Number of matches (k) must be at least 1".to_string(),
            ));
        }
        Ok(k)
    }

    /// Embed a validated query.
    ///
    /// Returns `None` when the embedder produces an all-zero vector: such a
    /// query is orthogonal to every unit and cannot match anything.
    ///
    /// # Errors
    /// `AppError::Config` when the embedder differs from the one the index
    /// was built with; checked before any embedding call.
    pub async fn embed_query(&self, query: &str) -> AppResult<Option<EmbeddingVector>> {
        self.index.check_fingerprint(&self.embedder.fingerprint())?;

        let raw = with_retries(&self.retry, "embed query", || self.embedder.embed(query)).await?;

        let expected = self.index.fingerprint().dimensions;
        if raw.len() != expected {
            return Err(AppError::Config(format!(
                "Query embedding has {} dimensions but the index uses {}",
                raw.len(),
                expected
            )));
        }

        if raw.iter().all(|x| *x == 0.0) {
            tracing::debug!("Query embedding is the zero vector; nothing can match");
            return Ok(None);
        }

        EmbeddingVector::normalized(raw)
            .map(Some)
            .ok_or_else(|| AppError::upstream_fatal("Query embedding contains non-finite values"))
    }

    /// Top-`k` units for an embedded query.
    pub fn search(
        &self,
        vector: Option<&EmbeddingVector>,
        k: usize,
    ) -> AppResult<Vec<RetrievedMatch<'_>>> {
        match vector {
            Some(vector) => self.index.search(vector, k),
            None => Ok(Vec::new()),
        }
    }

    /// Validate, embed and search in one step.
    pub async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<RetrievedMatch<'_>>> {
        self.validate_query(query)?;
        let k = Self::validate_k(k)?;
        let vector = self.embed_query(query).await?;
        let matches = self.search(vector.as_ref(), k)?;

        tracing::debug!(
            "Retrieved {} matches (top score: {:?})",
            matches.len(),
            matches.first().map(|m| m.score)
        );

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BuildOptions;
    use crate::tests::fixtures::{unit, ScriptedEmbedder};
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy::no_retries(Duration::from_secs(5))
    }

    async fn retriever_with(embedder: Arc<ScriptedEmbedder>) -> Retriever {
        let units = vec![unit("1.1", "theft law"), unit("1.2", "tax law")];
        let options = BuildOptions {
            concurrency: 1,
            retry: policy(),
        };
        let (index, _) = SimilarityIndex::build(units, embedder.as_ref(), &options)
            .await
            .unwrap();

        Retriever::new(
            Arc::new(index),
            embedder,
            RetrievalConfig::default(),
            policy(),
        )
    }

    fn embedder() -> ScriptedEmbedder {
        ScriptedEmbedder::new(2)
            .with("theft law", vec![1.0, 0.0])
            .with("tax law", vec![0.0, 1.0])
            .with("stolen goods", vec![0.9, 0.1])
            .with("silence", vec![0.0, 0.0])
    }

    #[tokio::test]
    async fn test_retrieve_ranks_matches() {
        let retriever = retriever_with(Arc::new(embedder())).await;
        let matches = retriever.retrieve("stolen goods", 3).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].unit.id, "Law 1.1");
        assert_eq!(retriever.default_k(), 3);
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_embedding() {
        let embedder = Arc::new(embedder());
        let retriever = retriever_with(Arc::clone(&embedder)).await;
        let before = embedder.calls();

        for query in ["", "   \n\t"] {
            let result = retriever.retrieve(query, 3).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
        assert_eq!(embedder.calls(), before);
    }

    #[tokio::test]
    async fn test_oversized_query_rejected() {
        let retriever = retriever_with(Arc::new(embedder())).await;
        let long = "a".repeat(2001);
        assert!(matches!(
            retriever.retrieve(&long, 3).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_k_rejected_before_embedding() {
        let embedder = Arc::new(embedder());
        let retriever = retriever_with(Arc::clone(&embedder)).await;
        let before = embedder.calls();

        let result = retriever.retrieve("stolen goods", 0).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(embedder.calls(), before);
        assert_eq!(Retriever::validate_k(4).unwrap(), 4);
    }

    #[tokio::test]
    async fn test_zero_query_vector_matches_nothing() {
        let retriever = retriever_with(Arc::new(embedder())).await;
        assert!(retriever.retrieve("silence", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch_before_embedding() {
        let built_with = Arc::new(embedder());
        let retriever = retriever_with(built_with).await;

        let other = Arc::new(embedder().with_model("scripted-v2"));
        let swapped = Retriever::new(
            Arc::clone(&retriever.index),
            Arc::clone(&other) as Arc<dyn EmbeddingProvider>,
            RetrievalConfig::default(),
            policy(),
        );

        let result = swapped.retrieve("stolen goods", 3).await;
        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(other.calls(), 0);
    }
}
