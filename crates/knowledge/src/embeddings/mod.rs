//! Embedding providers.
//!
//! Provider-agnostic embedding generation behind [`EmbeddingProvider`].

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
