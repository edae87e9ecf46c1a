//! RAG response types.

use serde::{Deserialize, Serialize};

/// Reply the model must give when the excerpts do not answer the question.
pub const INSUFFICIENT_CONTEXT: &str = "INSUFFICIENT_CONTEXT";

/// Response when no unit clears the relevance floor.
pub const NO_RELEVANT_INFORMATION: &str =
    "No relevant information was found in the document to answer this question.";

/// Response when the model declines to answer from the excerpts.
pub const NOT_ENOUGH_INFORMATION: &str =
    "The provided legal text does not contain enough information to answer this question.";

/// A supporting excerpt traceable to a source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Unit id, e.g. "Law 4.1.2"
    pub source: String,

    /// Unit text, verbatim or trimmed at a word boundary
    pub text: String,
}

/// How a query was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    #[default]
    Answered,
    /// Deliberate refusal: nothing relevant, or the model declined
    Refused,
}

/// Answer to one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub response: String,
    pub citations: Vec<Citation>,

    /// Internal: lets callers tell a refusal from an answer
    #[serde(skip)]
    pub disposition: Disposition,
}

impl QueryResult {
    pub fn answered(query: &str, response: String, citations: Vec<Citation>) -> Self {
        Self {
            query: query.to_string(),
            response,
            citations,
            disposition: Disposition::Answered,
        }
    }

    pub fn refused(query: &str, response: &str) -> Self {
        Self {
            query: query.to_string(),
            response: response.to_string(),
            citations: Vec::new(),
            disposition: Disposition::Refused,
        }
    }

    /// Refusal returned without consulting the model.
    pub fn no_relevant_information(query: &str) -> Self {
        Self::refused(query, NO_RELEVANT_INFORMATION)
    }

    pub fn is_refusal(&self) -> bool {
        self.disposition == Disposition::Refused
    }
}
