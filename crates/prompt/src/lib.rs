//! Prompt system for statute.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, overridable per workspace
//! - A built-in grounded-answer prompt
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, list_prompts, load_prompt, BUILTIN_PROMPT_ID};
pub use types::{BuiltPrompt, PromptBehavior, PromptDefinition, PromptOutputSpec};
