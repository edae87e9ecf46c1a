//! Error types for statute.
//!
//! A single error enum covers every failure the pipeline can surface. The
//! four externally meaningful categories (load, config, upstream,
//! validation) are exposed through [`AppError::kind`] so the boundary layer
//! can map them without matching on every variant.

use std::fmt;
use thiserror::Error;

/// Unified error type for statute.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The source document is missing, unreadable, or has no units.
    #[error("Load error: {0}")]
    Load(String),

    /// Missing or invalid configuration, credentials, or a model mismatch.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An embedding or completion provider failed or timed out.
    #[error("Upstream error: {message}")]
    Upstream { message: String, retryable: bool },

    /// The caller supplied an empty or malformed query.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Prompt definition or template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Boundary-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Load,
    Config,
    Upstream,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Config => "config",
            Self::Upstream => "upstream",
            Self::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    /// Transient provider failure that may succeed on retry.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable: true,
        }
    }

    /// Provider failure that will not go away by retrying (e.g. a 400).
    pub fn upstream_fatal(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable: false,
        }
    }

    /// Classify this error into one of the four boundary categories.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Load(_) | Self::Io(_) => ErrorKind::Load,
            Self::Config(_) | Self::Prompt(_) | Self::Serialization(_) => ErrorKind::Config,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Whether a bounded retry is allowed for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { retryable: true, .. })
    }

    /// Message safe to show to an end user.
    ///
    /// Provider failures never leak internal detail; validation errors are
    /// shown as-is since they describe the caller's own input.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Upstream => {
                "The service is temporarily unavailable. Please try again later.".to_string()
            }
            ErrorKind::Validation => self.to_string(),
            ErrorKind::Load => {
                "The legal document could not be loaded; the service cannot answer questions."
                    .to_string()
            }
            ErrorKind::Config => {
                "The service is misconfigured; contact the operator.".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
