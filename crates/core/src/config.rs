//! Configuration management for statute.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config file (`.statute/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources override earlier ones.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::retry::RetryPolicy;

/// Completion providers with a client implementation.
pub const COMPLETION_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Embedding providers with an implementation.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["trigram", "ollama", "openai"];

/// Environment variable consulted for OpenAI keys when no `apiKeyEnv` is set.
pub const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .statute/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Legal document to load at startup (relative paths resolve against the workspace)
    pub document: Option<PathBuf>,

    /// Completion provider (e.g., "openai", "ollama")
    pub provider: String,

    /// Completion model identifier
    pub model: String,

    /// Embedding provider (e.g., "openai", "ollama", "trigram")
    pub embedding_provider: String,

    /// API key override for the providers
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    /// Provider configurations
    pub llm: Option<LlmConfig>,

    /// Retriever settings
    pub retrieval: RetrievalConfig,

    /// Answer synthesizer settings
    pub synthesis: SynthesisConfig,

    /// Timeout and retry policy for provider calls
    pub upstream: RetryPolicy,
}

/// Provider section from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        #[serde(rename = "embeddingDimensions")]
        embedding_dimensions: Option<usize>,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        #[serde(rename = "embeddingDimensions")]
        embedding_dimensions: Option<usize>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Completion model for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Embedding model, if configured.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::OpenAI {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    /// Declared embedding dimensions, if configured.
    pub fn embedding_dimensions(&self) -> Option<usize> {
        match self {
            Self::OpenAI {
                embedding_dimensions,
                ..
            }
            | Self::Ollama {
                embedding_dimensions,
                ..
            } => *embedding_dimensions,
        }
    }

    /// Custom endpoint, if configured.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Per-call timeout override, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::OpenAI { .. } => None,
            Self::Ollama { timeout, .. } => timeout.map(Duration::from_secs),
        }
    }
}

/// How retrieved excerpts become citations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CitationPolicy {
    /// Only ids the model explicitly references
    #[default]
    Declared,
    /// Every excerpt placed in the prompt (all are above the relevance floor)
    RelevanceFloor,
}

/// Retriever settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of units to retrieve per query
    pub top_k: usize,

    /// Minimum similarity for a unit to be used as context
    pub relevance_floor: f32,

    /// Longest accepted query, in characters
    pub max_query_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            relevance_floor: 0.20,
            max_query_chars: 2000,
        }
    }
}

/// Answer synthesizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Upper bound on generated tokens
    pub max_tokens: u32,

    /// Longest citation excerpt, in characters
    pub max_excerpt_chars: usize,

    /// Citation selection policy
    pub citation_policy: CitationPolicy,

    /// Prompt definition used for grounded answers
    pub prompt_id: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            max_excerpt_chars: 1200,
            citation_policy: CitationPolicy::Declared,
            prompt_id: "legal.answer.grounded".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceSection>,
    document: Option<DocumentSection>,
    retrieval: Option<RetrievalSection>,
    synthesis: Option<SynthesisSection>,
    upstream: Option<UpstreamSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalSection {
    top_k: Option<usize>,
    relevance_floor: Option<f32>,
    max_query_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisSection {
    max_tokens: Option<u32>,
    max_excerpt_chars: Option<usize>,
    citation_policy: Option<CitationPolicy>,
    prompt_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamSection {
    max_attempts: Option<u32>,
    initial_backoff_ms: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            document: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            embedding_provider: "openai".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
            llm: None,
            retrieval: RetrievalConfig::default(),
            synthesis: SynthesisConfig::default(),
            upstream: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and the config file.
    ///
    /// Environment variables:
    /// - `STATUTE_WORKSPACE`: Override workspace path
    /// - `STATUTE_CONFIG`: Path to config file
    /// - `STATUTE_DOCUMENT`: Path to the legal document
    /// - `STATUTE_PROVIDER`: Completion provider
    /// - `STATUTE_MODEL`: Completion model
    /// - `STATUTE_EMBEDDING_PROVIDER`: Embedding provider
    /// - `STATUTE_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `STATUTE_WORKSPACE` and `STATUTE_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("STATUTE_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var("STATUTE_CONFIG").ok().map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.statute_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(document) = std::env::var("STATUTE_DOCUMENT") {
            config.document = Some(PathBuf::from(document));
        }

        if let Ok(provider) = std::env::var("STATUTE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("STATUTE_MODEL") {
            config.model = model;
        }

        if let Ok(provider) = std::env::var("STATUTE_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }

        config.api_key = std::env::var("STATUTE_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merged_with(config_file))
    }

    fn merged_with(&self, config_file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(path) = config_file.document.and_then(|doc| doc.path) {
            result.document = Some(PathBuf::from(path));
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.json_logs = json;
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            if let Some(top_k) = retrieval.top_k {
                result.retrieval.top_k = top_k;
            }
            if let Some(floor) = retrieval.relevance_floor {
                result.retrieval.relevance_floor = floor;
            }
            if let Some(max) = retrieval.max_query_chars {
                result.retrieval.max_query_chars = max;
            }
        }

        if let Some(synthesis) = config_file.synthesis {
            if let Some(max_tokens) = synthesis.max_tokens {
                result.synthesis.max_tokens = max_tokens;
            }
            if let Some(max) = synthesis.max_excerpt_chars {
                result.synthesis.max_excerpt_chars = max;
            }
            if let Some(policy) = synthesis.citation_policy {
                result.synthesis.citation_policy = policy;
            }
            if let Some(prompt_id) = synthesis.prompt_id {
                result.synthesis.prompt_id = prompt_id;
            }
        }

        if let Some(upstream) = config_file.upstream {
            if let Some(attempts) = upstream.max_attempts {
                result.upstream.max_attempts = attempts;
            }
            if let Some(ms) = upstream.initial_backoff_ms {
                result.upstream.initial_backoff = Duration::from_millis(ms);
            }
            if let Some(secs) = upstream.timeout_secs {
                result.upstream.call_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            result.embedding_provider = llm.active_embedding_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        document: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(document) = document {
            self.document = Some(document);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .statute directory.
    pub fn statute_dir(&self) -> PathBuf {
        self.workspace.join(".statute")
    }

    /// Resolve the legal document path.
    ///
    /// Defaults to `docs/laws.md` inside the workspace.
    pub fn document_path(&self) -> PathBuf {
        match &self.document {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.workspace.join(path),
            None => self.workspace.join("docs").join("laws.md"),
        }
    }

    /// Get a provider's configuration block, if present.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider))
    }

    /// Retry policy for calls to `provider`.
    ///
    /// A `timeout` in the provider block replaces `upstream.timeoutSecs`.
    pub fn upstream_for(&self, provider: &str) -> RetryPolicy {
        let mut policy = self.upstream.clone();
        if let Some(timeout) = self
            .get_provider_config(provider)
            .and_then(ProviderConfig::timeout)
        {
            policy.call_timeout = timeout;
        }
        policy
    }

    /// Resolve the API key for a provider.
    ///
    /// `STATUTE_API_KEY` wins; otherwise the provider's `apiKeyEnv` is read,
    /// falling back to `OPENAI_API_KEY` for OpenAI.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => Some(api_key_env.as_str()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider == "openai" => Some(DEFAULT_OPENAI_KEY_ENV),
            None => None,
        };

        env_var.and_then(|var| std::env::var(var).ok())
    }

    /// Validate the configuration before serving queries.
    pub fn validate(&self) -> AppResult<()> {
        if !COMPLETION_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                COMPLETION_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        for provider in [&self.provider, &self.embedding_provider] {
            if provider == "openai" && self.resolve_api_key(provider).is_none() {
                let env_var = match self.get_provider_config(provider) {
                    Some(ProviderConfig::OpenAI { api_key_env, .. }) => api_key_env.clone(),
                    _ => DEFAULT_OPENAI_KEY_ENV.to_string(),
                };
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    env_var
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be at least 1".to_string(),
            ));
        }

        if !(-1.0..=1.0).contains(&self.retrieval.relevance_floor) {
            return Err(AppError::Config(format!(
                "retrieval.relevanceFloor must be within [-1, 1], got {}",
                self.retrieval.relevance_floor
            )));
        }

        if self.synthesis.max_tokens == 0 {
            return Err(AppError::Config(
                "synthesis.maxTokens must be at least 1".to_string(),
            ));
        }

        if self.upstream.max_attempts == 0 {
            return Err(AppError::Config(
                "upstream.maxAttempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
