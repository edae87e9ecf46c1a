//! Query service: the single entry point for answering questions.
//!
//! Owns the retriever (and through it the read-only index) and the answer
//! synthesizer. Every call to [`QueryService::answer`] is independent; the
//! service can be shared behind an `Arc` and queried concurrently.

use crate::document::load_document;
use crate::embeddings::{create_provider, EmbeddingConfig};
use crate::index::{BuildOptions, BuildReport, SimilarityIndex};
use crate::rag::{AnswerSynthesizer, QueryResult, SynthesisOptions};
use crate::retriever::Retriever;
use crate::types::{RetrievedMatch, SourceUnit};
use statute_core::{AppConfig, AppResult};
use statute_llm::create_client;
use statute_prompt::load_prompt;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Lifecycle of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Embedded,
    Retrieved,
    Prompted,
    Answered,
    Refused,
    Errored,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Embedded => "embedded",
            Self::Retrieved => "retrieved",
            Self::Prompted => "prompted",
            Self::Answered => "answered",
            Self::Refused => "refused",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn transition(state: RequestState) {
    tracing::debug!(state = state.as_str(), "Request {}", state);
}

/// Answers legal questions from one loaded document.
pub struct QueryService {
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl QueryService {
    pub fn new(retriever: Retriever, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            retriever,
            synthesizer,
        }
    }

    /// Load the configured document, build its index and wire up providers.
    ///
    /// # Errors
    /// `AppError::Config` for invalid settings or unknown providers,
    /// `AppError::Load` when the document cannot be read or parsed, and the
    /// last embedding failure when no unit could be indexed.
    pub async fn bootstrap(config: &AppConfig) -> AppResult<(Self, BuildReport)> {
        config.validate()?;

        let endpoint = config
            .get_provider_config(&config.provider)
            .and_then(|block| block.endpoint());
        let api_key = config.resolve_api_key(&config.provider);
        let completion_policy = config.upstream_for(&config.provider);
        let embedding_policy = config.upstream_for(&config.embedding_provider);
        let llm = create_client(
            &config.provider,
            endpoint,
            api_key.as_deref(),
            completion_policy.call_timeout,
        )?;

        let prompt = load_prompt(&config.workspace, &config.synthesis.prompt_id)?;

        let embedder = create_provider(&EmbeddingConfig::from_app_config(config)?)?;

        let units = load_document(&config.document_path())?;

        let options = BuildOptions {
            retry: embedding_policy.clone(),
            ..BuildOptions::default()
        };
        let (index, report) = SimilarityIndex::build(units, embedder.as_ref(), &options).await?;

        let retriever = Retriever::new(
            Arc::new(index),
            embedder,
            config.retrieval.clone(),
            embedding_policy,
        );
        let synthesizer = AnswerSynthesizer::new(
            llm,
            prompt,
            SynthesisOptions::from_config(config),
            completion_policy,
        )?;

        tracing::info!(
            "Ready: {} units indexed with {}, answering with {}/{}",
            report.indexed,
            report.fingerprint,
            config.provider,
            config.model
        );

        Ok((Self::new(retriever, synthesizer), report))
    }

    /// Answer `query` from the document.
    ///
    /// Refusals are returned as `Ok` results; errors are reserved for
    /// invalid queries and provider failures.
    pub async fn answer(&self, query: &str) -> AppResult<QueryResult> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("query", %request_id);

        async {
            let result = self.run(query).await;
            if let Err(ref e) = result {
                transition(RequestState::Errored);
                tracing::warn!(kind = e.kind().as_str(), "Query failed: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, query: &str) -> AppResult<QueryResult> {
        transition(RequestState::Received);
        self.retriever.validate_query(query)?;

        let vector = self.retriever.embed_query(query).await?;
        transition(RequestState::Embedded);

        let matches = self
            .retriever
            .search(vector.as_ref(), self.retriever.default_k())?;
        transition(RequestState::Retrieved);
        tracing::debug!(
            "{} candidates (top score: {:?})",
            matches.len(),
            matches.first().map(|m| m.score)
        );

        if !self.synthesizer.relevant(&matches).is_empty() {
            transition(RequestState::Prompted);
        }
        let result = self.synthesizer.synthesize(query, &matches).await?;

        transition(if result.is_refusal() {
            RequestState::Refused
        } else {
            RequestState::Answered
        });
        Ok(result)
    }

    /// Retrieval only: the `k` best units for `query` with their scores.
    pub async fn search(&self, query: &str, k: usize) -> AppResult<Vec<RetrievedMatch<'_>>> {
        self.retriever.retrieve(query, k).await
    }

    /// Units held by the index, in document order.
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.retriever.index().units()
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.synthesizer
    }
}
