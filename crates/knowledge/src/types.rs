//! Core types for the statute knowledge pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One addressable entry of the legal document (e.g. "Law 4.1.2").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Structural label, unique within a document
    pub id: String,

    /// Normalized body text, never empty
    pub text: String,

    /// Where the unit came from
    pub origin: UnitOrigin,
}

/// Location of a unit within its source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOrigin {
    /// Bare section number, e.g. "4.1.2"
    pub section: String,

    /// Title of the enclosing heading, if the heading covers this section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// 1-based line where the unit starts
    pub line: usize,
}

/// An L2-normalized embedding.
///
/// Construction goes through [`EmbeddingVector::normalized`], so every
/// instance has unit length and finite components.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Normalize a raw provider vector.
    ///
    /// Returns `None` for empty, all-zero, or non-finite vectors, which
    /// cannot be compared by cosine similarity.
    pub fn normalized(raw: Vec<f32>) -> Option<Self> {
        if raw.is_empty() || raw.iter().any(|x| !x.is_finite()) {
            return None;
        }

        let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return None;
        }

        Some(Self(raw.into_iter().map(|x| x / norm).collect()))
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Inner product; equals cosine similarity for normalized vectors.
    pub fn dot(&self, other: &Self) -> f32 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }
}

/// A unit paired with its embedding, owned by the index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub unit: SourceUnit,
    pub vector: EmbeddingVector,
}

/// A search hit borrowing its unit from the index.
#[derive(Debug, Clone, Copy)]
pub struct RetrievedMatch<'a> {
    pub unit: &'a SourceUnit,

    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Identity of the embedding model that produced an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingFingerprint {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl fmt::Display for EmbeddingFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} dims)", self.provider, self.model, self.dimensions)
    }
}
