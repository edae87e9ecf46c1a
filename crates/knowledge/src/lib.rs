//! Legal document question answering.
//!
//! Loads one legal document, embeds its numbered sections into an in-memory
//! similarity index, and answers questions with a completion model that may
//! only use (and must cite) the retrieved sections.

pub mod document;
pub mod embeddings;
pub mod index;
pub mod rag;
pub mod retriever;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use document::{load_document, DocumentFormat};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::{BuildOptions, BuildReport, DroppedUnit, SimilarityIndex};
pub use rag::{AnswerSynthesizer, Citation, Disposition, QueryResult, SynthesisOptions};
pub use retriever::Retriever;
pub use service::{QueryService, RequestState};
pub use types::{EmbeddingFingerprint, EmbeddingVector, RetrievedMatch, SourceUnit, UnitOrigin};
