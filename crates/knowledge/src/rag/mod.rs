//! Grounded answer synthesis.
//!
//! Turns retrieved units into a prompt, asks the model for an answer that
//! cites unit ids, and maps the reply back to verifiable citations.

pub mod citations;
pub mod synthesizer;
pub mod types;

pub use synthesizer::{AnswerSynthesizer, SynthesisOptions};
pub use types::{Citation, Disposition, QueryResult};
