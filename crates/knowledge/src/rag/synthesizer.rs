//! Grounded answer synthesis.
//!
//! Retrieves nothing itself: given ranked matches it drops those under the
//! relevance floor, prompts the model with the rest, and turns the reply
//! into a [`QueryResult`] whose citations all point at prompted units.

use crate::rag::citations::{is_refusal, trim_excerpt, CitationParser};
use crate::rag::types::{Citation, QueryResult, INSUFFICIENT_CONTEXT, NOT_ENOUGH_INFORMATION};
use crate::types::RetrievedMatch;
use serde::Serialize;
use statute_core::{with_retries, AppConfig, AppResult, CitationPolicy, RetryPolicy};
use statute_llm::{LlmClient, LlmRequest};
use statute_prompt::{build_prompt, BuiltPrompt, PromptDefinition};
use std::sync::Arc;

/// Synthesis settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    /// Completion model identifier
    pub model: String,

    /// Matches scoring below this are never shown to the model
    pub relevance_floor: f32,

    pub max_tokens: u32,

    /// Excerpt length limit, in characters
    pub max_excerpt_chars: usize,

    pub citation_policy: CitationPolicy,
}

impl SynthesisOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            relevance_floor: config.retrieval.relevance_floor,
            max_tokens: config.synthesis.max_tokens,
            max_excerpt_chars: config.synthesis.max_excerpt_chars,
            citation_policy: config.synthesis.citation_policy,
        }
    }
}

#[derive(Serialize)]
struct PromptData<'a> {
    query: &'a str,
    sentinel: &'static str,
    excerpts: Vec<Excerpt<'a>>,
}

#[derive(Serialize)]
struct Excerpt<'a> {
    id: &'a str,
    title: Option<&'a str>,
    text: &'a str,
}

/// Builds grounded answers from retrieved units.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    options: SynthesisOptions,
    retry: RetryPolicy,
    parser: CitationParser,
}

impl AnswerSynthesizer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        options: SynthesisOptions,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        Ok(Self {
            llm,
            prompt,
            options,
            retry,
            parser: CitationParser::new()?,
        })
    }

    /// Matches at or above the relevance floor, in rank order.
    pub fn relevant<'a>(&self, matches: &[RetrievedMatch<'a>]) -> Vec<RetrievedMatch<'a>> {
        matches
            .iter()
            .filter(|m| m.score >= self.options.relevance_floor)
            .copied()
            .collect()
    }

    /// Answer `query` from `matches`.
    ///
    /// Returns the fixed no-information refusal without calling the model
    /// when nothing clears the relevance floor.
    pub async fn synthesize(
        &self,
        query: &str,
        matches: &[RetrievedMatch<'_>],
    ) -> AppResult<QueryResult> {
        let relevant = self.relevant(matches);
        if relevant.is_empty() {
            tracing::info!(
                "No match at or above relevance floor {:.2} ({} candidates)",
                self.options.relevance_floor,
                matches.len()
            );
            return Ok(QueryResult::no_relevant_information(query));
        }

        self.answer_from(query, &relevant).await
    }

    async fn answer_from(
        &self,
        query: &str,
        relevant: &[RetrievedMatch<'_>],
    ) -> AppResult<QueryResult> {
        if relevant.is_empty() {
            return Ok(QueryResult::no_relevant_information(query));
        }

        let built = self.render_prompt(query, relevant)?;

        let mut request = LlmRequest::new(built.user, self.options.model.as_str())
            .with_temperature(0.0)
            .with_max_tokens(self.options.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = with_retries(&self.retry, "completion", || self.llm.complete(&request)).await?;

        if !response.done {
            tracing::warn!(
                "Completion stopped at the token limit ({} tokens)",
                self.options.max_tokens
            );
        }

        let content = response.content.trim();
        if is_refusal(content) {
            tracing::info!("Model declined: excerpts do not answer the question");
            return Ok(QueryResult::refused(query, NOT_ENOUGH_INFORMATION));
        }

        let citations = self.citations_for(content, relevant);
        Ok(QueryResult::answered(query, content.to_string(), citations))
    }

    /// Render the grounded prompt for `relevant`.
    pub fn render_prompt(
        &self,
        query: &str,
        relevant: &[RetrievedMatch<'_>],
    ) -> AppResult<BuiltPrompt> {
        let data = PromptData {
            query,
            sentinel: INSUFFICIENT_CONTEXT,
            excerpts: relevant
                .iter()
                .map(|m| Excerpt {
                    id: &m.unit.id,
                    title: m.unit.origin.title.as_deref(),
                    text: trim_excerpt(&m.unit.text, self.options.max_excerpt_chars),
                })
                .collect(),
        };

        build_prompt(&self.prompt, &data)
    }

    fn citations_for(&self, content: &str, relevant: &[RetrievedMatch<'_>]) -> Vec<Citation> {
        let cite = |m: &RetrievedMatch<'_>| Citation {
            source: m.unit.id.clone(),
            text: trim_excerpt(&m.unit.text, self.options.max_excerpt_chars).to_string(),
        };

        match self.options.citation_policy {
            CitationPolicy::RelevanceFloor => relevant.iter().map(cite).collect(),
            CitationPolicy::Declared => {
                let allowed: Vec<&str> = relevant.iter().map(|m| m.unit.id.as_str()).collect();
                let ids = self.parser.referenced_ids(content, &allowed);

                if ids.is_empty() {
                    tracing::warn!("Answer cites no prompted unit; returning it without citations");
                }

                ids.iter()
                    .filter_map(|id| relevant.iter().find(|m| &m.unit.id == id))
                    .map(cite)
                    .collect()
            }
        }
    }
}
