//! Structural splitting of a legal document into numbered units.
//!
//! The input is the Markdown rendering of the law book: bold headings such
//! as `**4.1.** **Trials of the Crown**` set the title context, and lines
//! starting with a section number (`4.1.1. text`) open a new unit.

use crate::document::normalize::Normalizer;
use crate::types::{SourceUnit, UnitOrigin};
use regex::Regex;
use statute_core::{AppError, AppResult};
use std::collections::HashMap;

/// Prefix turning a section number into a unit id.
pub const UNIT_ID_PREFIX: &str = "Law";

/// Line-oriented section parser.
#[derive(Debug, Clone)]
pub struct SectionParser {
    citations: Regex,
    heading: Regex,
    numbered: Regex,
    normalizer: Normalizer,
}

/// Heading context in effect while scanning.
struct Heading {
    number: String,
    title: String,
}

impl Heading {
    /// A heading covers its own number and every subsection below it.
    fn covers(&self, section: &str) -> bool {
        section == self.number
            || section
                .strip_prefix(self.number.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// A unit being accumulated.
struct OpenUnit {
    section: String,
    title: Option<String>,
    line: usize,
    lines: Vec<String>,
}

impl SectionParser {
    pub fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::Config(format!("Invalid section pattern: {}", e)))
        };

        Ok(Self {
            citations: compile(r"(?i)(\*\*Citations:\*\*|Citations:)")?,
            heading: compile(r"^\*\*(\d+(?:\.\d+)*)\.\*\*\s+\*\*(.*?)\*\*\s*$")?,
            numbered: compile(r"^(?:\*\*)?(\d+(?:\.\d+)*)\.(?:\*\*)?(?:\s+(.*?))?\s*$")?,
            normalizer: Normalizer::new()?,
        })
    }

    /// Split `content` into units in document order.
    ///
    /// Returns an empty vector when nothing numbered is found; callers
    /// decide whether that is an error.
    pub fn parse(&self, content: &str) -> Vec<SourceUnit> {
        let body = match self.citations.find(content) {
            Some(m) => {
                tracing::debug!("Discarding trailing citations block at byte {}", m.start());
                &content[..m.start()]
            }
            None => content,
        };

        let mut units = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut heading: Option<Heading> = None;
        let mut open: Option<OpenUnit> = None;

        for (idx, raw_line) in body.lines().enumerate() {
            let line = raw_line.trim_end();

            if let Some(caps) = self.heading.captures(line.trim()) {
                self.close(open.take(), &mut units, &mut seen);
                heading = Some(Heading {
                    number: caps[1].to_string(),
                    title: caps[2].trim().to_string(),
                });
                continue;
            }

            if let Some(caps) = self.numbered.captures(line) {
                self.close(open.take(), &mut units, &mut seen);

                let section = caps[1].to_string();
                let title = heading
                    .as_ref()
                    .filter(|h| h.covers(&section))
                    .map(|h| h.title.clone())
                    .filter(|t| !t.is_empty());
                let first = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

                open = Some(OpenUnit {
                    section,
                    title,
                    line: idx + 1,
                    lines: if first.is_empty() {
                        Vec::new()
                    } else {
                        vec![first.to_string()]
                    },
                });
                continue;
            }

            if let Some(unit) = open.as_mut() {
                unit.lines.push(line.to_string());
            }
        }

        self.close(open, &mut units, &mut seen);
        units
    }

    fn close(
        &self,
        open: Option<OpenUnit>,
        units: &mut Vec<SourceUnit>,
        seen: &mut HashMap<String, usize>,
    ) {
        let Some(unit) = open else {
            return;
        };

        let text = self.normalizer.normalize(&unit.lines.join("\n"));
        if text.is_empty() {
            tracing::debug!(
                "Skipping section {} at line {}: empty body",
                unit.section,
                unit.line
            );
            return;
        }

        let label = format!("{} {}", UNIT_ID_PREFIX, unit.section);
        let count = seen.entry(label.clone()).or_insert(0);
        *count += 1;

        let id = if *count == 1 {
            label
        } else {
            let suffixed = format!("{} ({})", label, count);
            tracing::warn!(
                "Duplicate section label '{}' at line {}; using id '{}'",
                label,
                unit.line,
                suffixed
            );
            suffixed
        };

        units.push(SourceUnit {
            id,
            text,
            origin: UnitOrigin {
                section: unit.section,
                title: unit.title,
                line: unit.line,
            },
        });
    }
}
