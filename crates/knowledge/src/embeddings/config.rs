//! Embedding provider configuration resolved from the application config.

use statute_core::{AppConfig, AppError, AppResult};
use std::time::Duration;

/// Resolved settings for one embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Declared embedding dimensions
    pub dimensions: usize,

    /// Custom API endpoint
    pub endpoint: Option<String>,

    /// API key for hosted providers
    pub api_key: Option<String>,

    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: None,
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingConfig {
    /// Built-in model and dimensions for a provider.
    pub fn defaults_for(provider: &str) -> AppResult<Self> {
        let (model, dimensions) = match provider {
            "trigram" => ("trigram-v1", 384),
            "ollama" => ("nomic-embed-text", 768),
            "openai" => ("text-embedding-3-small", 1536),
            other => {
                return Err(AppError::Config(format!(
                    "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, openai",
                    other
                )))
            }
        };

        Ok(Self {
            provider: provider.to_string(),
            model: model.to_string(),
            dimensions,
            endpoint: None,
            api_key: None,
            timeout: Duration::from_secs(30),
        })
    }

    /// Resolve the active embedding provider from application config.
    ///
    /// Values from the provider's `llm.providers.<name>` block override the
    /// built-in defaults.
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        let provider = config.embedding_provider.as_str();
        let mut resolved = Self::defaults_for(provider)?;
        resolved.timeout = config.upstream_for(provider).call_timeout;

        if let Some(block) = config.get_provider_config(provider) {
            if let Some(model) = block.embedding_model() {
                resolved.model = model.to_string();
            }
            if let Some(dimensions) = block.embedding_dimensions() {
                resolved.dimensions = dimensions;
            }
            resolved.endpoint = block.endpoint().map(str::to_string);
        }

        if provider == "openai" {
            resolved.api_key = config.resolve_api_key(provider);
        }

        if resolved.dimensions == 0 {
            return Err(AppError::Config(format!(
                "Embedding dimensions for '{}' must be at least 1",
                provider
            )));
        }

        Ok(resolved)
    }
}
