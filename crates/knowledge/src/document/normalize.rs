//! Text normalization applied once, at load time.

use regex::Regex;
use statute_core::{AppError, AppResult};

/// Normalizes raw unit bodies.
#[derive(Debug, Clone)]
pub struct Normalizer {
    hyphen_break: Regex,
}

impl Normalizer {
    pub fn new() -> AppResult<Self> {
        let hyphen_break = Regex::new(r"(\p{L})-[ \t]*\r?\n\s*(\p{L})")
            .map_err(|e| AppError::Config(format!("Invalid normalization pattern: {}", e)))?;
        Ok(Self { hyphen_break })
    }

    /// Join hyphenated line breaks, strip emphasis markers and collapse
    /// whitespace.
    ///
    /// `"misde-\nmeanor"` becomes `"misdemeanor"`; a hyphen followed by an
    /// uppercase word (`"Anglo-\nSaxon"`) is kept as a real hyphen.
    pub fn normalize(&self, raw: &str) -> String {
        let joined = self.hyphen_break.replace_all(raw, |caps: &regex::Captures<'_>| {
            let next = &caps[2];
            if next.chars().all(char::is_lowercase) {
                format!("{}{}", &caps[1], next)
            } else {
                format!("{}-{}", &caps[1], next)
            }
        });
        let stripped = joined.replace("**", "").replace("__", "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
