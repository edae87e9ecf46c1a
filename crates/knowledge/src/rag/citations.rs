//! Mapping model replies back to unit ids.

use crate::document::sections::UNIT_ID_PREFIX;
use crate::rag::types::INSUFFICIENT_CONTEXT;
use regex::Regex;
use statute_core::{AppError, AppResult};
use unicode_segmentation::UnicodeSegmentation;

/// Extracts bracketed unit references such as `[Law 4.1.2]`, `[4.1.2]`
/// or `[Law 4.1.2, Law 4.1.3]`.
#[derive(Debug, Clone)]
pub struct CitationParser {
    brackets: Regex,
    bare_section: Regex,
}

impl CitationParser {
    pub fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::Config(format!("Invalid citation pattern: {}", e)))
        };

        Ok(Self {
            brackets: compile(r"\[([^\[\]]+)\]")?,
            bare_section: compile(r"^\d+(?:\.\d+)*(?: \(\d+\))?$")?,
        })
    }

    /// Ids from `allowed` referenced in `response`, in order of first
    /// mention and without duplicates. Unknown references are ignored.
    pub fn referenced_ids(&self, response: &str, allowed: &[&str]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();

        for caps in self.brackets.captures_iter(response) {
            for token in caps[1].split([',', ';']) {
                let Some(candidate) = self.canonical_id(token) else {
                    continue;
                };

                match allowed.iter().find(|id| **id == candidate) {
                    Some(id) if !ids.iter().any(|seen| seen.as_str() == *id) => ids.push(id.to_string()),
                    Some(_) => {}
                    None => tracing::debug!("Ignoring reference to unknown unit '{}'", candidate),
                }
            }
        }

        ids
    }

    fn canonical_id(&self, token: &str) -> Option<String> {
        let token = token.trim().trim_end_matches('.').trim();
        if token.is_empty() {
            return None;
        }

        let prefix_len = UNIT_ID_PREFIX.len();
        let has_prefix = token
            .get(..prefix_len)
            .is_some_and(|p| p.eq_ignore_ascii_case(UNIT_ID_PREFIX))
            && token[prefix_len..].starts_with(char::is_whitespace);

        let section = if has_prefix {
            token[prefix_len..].trim()
        } else {
            token
        };

        self.bare_section
            .is_match(section)
            .then(|| format!("{} {}", UNIT_ID_PREFIX, section))
    }
}

/// True when the model declined to answer: an empty reply or one that
/// contains the insufficient-context sentinel anywhere.
pub fn is_refusal(response: &str) -> bool {
    let trimmed = response.trim();
    trimmed.is_empty() || trimmed.contains(INSUFFICIENT_CONTEXT)
}

/// Prefix of `text` of at most `max_chars` characters, cut at a word
/// boundary. Text within the limit is returned unchanged.
pub fn trim_excerpt(text: &str, max_chars: usize) -> &str {
    if text.chars().count() <= max_chars {
        return text;
    }

    let mut end = 0;
    let mut count = 0;
    for (idx, segment) in text.split_word_bound_indices() {
        let len = segment.chars().count();
        if count + len > max_chars {
            break;
        }
        count += len;
        end = idx + segment.len();
    }

    let trimmed = text[..end].trim_end();
    if !trimmed.is_empty() {
        return trimmed;
    }

    // First word alone exceeds the limit
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..cut]
}
