//! In-memory similarity index over embedded source units.
//!
//! The index is built once from a document's units and is read-only
//! afterwards; a new document means a new index. Vectors are L2-normalized
//! at insertion and queries are normalized before scoring, so the inner
//! product is the cosine similarity.

use crate::embeddings::EmbeddingProvider;
use crate::types::{EmbeddingFingerprint, EmbeddingVector, IndexEntry, RetrievedMatch, SourceUnit};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use sha2::{Digest, Sha256};
use statute_core::{with_retries, AppError, AppResult, RetryPolicy};

/// Settings for [`SimilarityIndex::build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Maximum embedding requests in flight
    pub concurrency: usize,

    /// Retry and timeout policy for each embedding call
    pub retry: RetryPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// A unit left out of the index.
#[derive(Debug, Clone, Serialize)]
pub struct DroppedUnit {
    pub id: String,
    pub reason: String,
}

/// Summary of an index build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Units embedded and stored
    pub indexed: usize,

    /// Units skipped, with the reason
    pub dropped: Vec<DroppedUnit>,

    /// Embedding model identity recorded in the index
    pub fingerprint: EmbeddingFingerprint,

    /// SHA-256 (hex) of the normalized unit texts
    pub document_digest: String,

    pub built_at: DateTime<Utc>,
}

/// Read-only similarity index.
#[derive(Debug)]
pub struct SimilarityIndex {
    entries: Vec<IndexEntry>,
    fingerprint: EmbeddingFingerprint,
}

impl SimilarityIndex {
    /// Embed every unit and build the index.
    ///
    /// Units are embedded independently with bounded concurrency; result
    /// order follows input order. A unit whose embedding fails, has the
    /// wrong dimension, or cannot be normalized is dropped and reported.
    ///
    /// # Errors
    /// When every unit of a non-empty input is dropped, the last failure is
    /// returned instead of an index that could never answer anything.
    pub async fn build(
        units: Vec<SourceUnit>,
        embedder: &dyn EmbeddingProvider,
        options: &BuildOptions,
    ) -> AppResult<(Self, BuildReport)> {
        let fingerprint = embedder.fingerprint();
        let document_digest = digest(&units);
        let total = units.len();

        tracing::info!(
            "Building index for {} units with {}",
            total,
            fingerprint
        );

        let outcomes: Vec<Result<IndexEntry, (DroppedUnit, AppError)>> = stream::iter(units)
            .map(|unit| embed_unit(unit, embedder, fingerprint.dimensions, &options.retry))
            .buffered(options.concurrency.max(1))
            .collect()
            .await;

        let mut entries = Vec::with_capacity(total);
        let mut dropped = Vec::new();
        let mut last_error = None;

        for outcome in outcomes {
            match outcome {
                Ok(entry) => entries.push(entry),
                Err((unit, error)) => {
                    tracing::warn!("Dropping unit '{}': {}", unit.id, unit.reason);
                    dropped.push(unit);
                    last_error = Some(error);
                }
            }
        }

        if entries.is_empty() {
            if let Some(error) = last_error {
                tracing::error!("All {} units failed to embed", total);
                return Err(error);
            }
        }

        tracing::info!(
            "Indexed {} units ({} dropped)",
            entries.len(),
            dropped.len()
        );

        let report = BuildReport {
            indexed: entries.len(),
            dropped,
            fingerprint: fingerprint.clone(),
            document_digest,
            built_at: Utc::now(),
        };

        Ok((
            Self {
                entries,
                fingerprint,
            },
            report,
        ))
    }

    /// Return up to `k` entries most similar to `query`, best first.
    ///
    /// Equal scores keep insertion (document) order.
    ///
    /// # Errors
    /// `AppError::Config` if the query dimension differs from the index.
    pub fn search(&self, query: &EmbeddingVector, k: usize) -> AppResult<Vec<RetrievedMatch<'_>>> {
        if query.dimensions() != self.fingerprint.dimensions {
            return Err(AppError::Config(format!(
                "Query embedding has {} dimensions but the index uses {}",
                query.dimensions(),
                self.fingerprint.dimensions
            )));
        }

        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<RetrievedMatch<'_>> = self
            .entries
            .iter()
            .map(|entry| RetrievedMatch {
                unit: &entry.unit,
                score: entry.vector.dot(query),
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(k);

        Ok(matches)
    }

    /// Fail unless `other` matches the embedder this index was built with.
    pub fn check_fingerprint(&self, other: &EmbeddingFingerprint) -> AppResult<()> {
        if *other != self.fingerprint {
            return Err(AppError::Config(format!(
                "Embedding model mismatch: index built with {}, query embedder is {}",
                self.fingerprint, other
            )));
        }
        Ok(())
    }

    pub fn fingerprint(&self) -> &EmbeddingFingerprint {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed units in document order.
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.entries.iter().map(|entry| &entry.unit)
    }
}

async fn embed_unit(
    unit: SourceUnit,
    embedder: &dyn EmbeddingProvider,
    dimensions: usize,
    retry: &RetryPolicy,
) -> Result<IndexEntry, (DroppedUnit, AppError)> {
    let reject = |unit: &SourceUnit, error: AppError| {
        (
            DroppedUnit {
                id: unit.id.clone(),
                reason: error.to_string(),
            },
            error,
        )
    };

    let raw = match with_retries(retry, "embed unit", || embedder.embed(&unit.text)).await {
        Ok(raw) => raw,
        Err(e) => return Err(reject(&unit, e)),
    };

    if raw.len() != dimensions {
        let error = AppError::Config(format!(
            "Embedding has {} dimensions, expected {}",
            raw.len(),
            dimensions
        ));
        return Err(reject(&unit, error));
    }

    match EmbeddingVector::normalized(raw) {
        Some(vector) => Ok(IndexEntry { unit, vector }),
        None => {
            let error = AppError::upstream_fatal("Embedding is zero or non-finite");
            Err(reject(&unit, error))
        }
    }
}

fn digest(units: &[SourceUnit]) -> String {
    let mut hasher = Sha256::new();
    for unit in units {
        hasher.update(unit.text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
