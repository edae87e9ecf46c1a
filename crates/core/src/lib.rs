//! Statute Core Library
//!
//! Foundational utilities shared by every statute crate:
//! - Error handling (`AppError`, `AppResult`, `ErrorKind`)
//! - Logging infrastructure
//! - Configuration management
//! - Retry and timeout policy for provider calls

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export commonly used types
pub use config::{AppConfig, CitationPolicy};
pub use error::{AppError, AppResult, ErrorKind};
pub use retry::{with_retries, RetryPolicy};
