use crate::document::SectionParser;
use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::{BuildOptions, SimilarityIndex};
use crate::rag::types::{NO_RELEVANT_INFORMATION, NOT_ENOUGH_INFORMATION};
use crate::rag::{AnswerSynthesizer, Disposition, SynthesisOptions};
use crate::retriever::Retriever;
use crate::service::QueryService;
use crate::tests::fixtures::{FakeLlm, ScriptedEmbedder, StalledLlm};
use crate::types::SourceUnit;
use statute_core::config::RetrievalConfig;
use statute_core::{AppError, CitationPolicy, ErrorKind, RetryPolicy};
use statute_llm::LlmClient;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const LAWS: &str = "\
# The Laws of the Realm

**4.** **Crimes**

**4.1.** **Trials of the Crown**

4.1.1. Trials shall be heard before the Crown.

4.1.2. Theft is punishable by a fine.

**4.2.** **Taxes**

4.2.1. Tax evasion is punishable by banishment.
";

const MISDEMEANORS: &str = "\
**4.** **Crimes**

4.1.2. Theft of goods under $500 is a misdemeanor.

4.2.1. Tax evasion is punishable by banishment.
";

fn units() -> Vec<SourceUnit> {
    parse(LAWS)
}

fn parse(document: &str) -> Vec<SourceUnit> {
    SectionParser::new().unwrap().parse(document)
}

fn policy() -> RetryPolicy {
    RetryPolicy::no_retries(Duration::from_secs(5))
}

async fn service_with(
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<FakeLlm>,
    citation_policy: CitationPolicy,
) -> QueryService {
    build_service(units(), embedder, llm, citation_policy, policy()).await
}

async fn build_service(
    units: Vec<SourceUnit>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    citation_policy: CitationPolicy,
    completion_policy: RetryPolicy,
) -> QueryService {
    let options = BuildOptions {
        concurrency: 2,
        retry: policy(),
    };
    let (index, _) = SimilarityIndex::build(units, embedder.as_ref(), &options)
        .await
        .unwrap();

    let retriever = Retriever::new(
        Arc::new(index),
        embedder,
        RetrievalConfig::default(),
        policy(),
    );
    let synthesizer = AnswerSynthesizer::new(
        llm,
        statute_prompt::builtin_prompt().unwrap(),
        SynthesisOptions {
            model: "test-model".to_string(),
            relevance_floor: 0.20,
            max_tokens: 512,
            max_excerpt_chars: 1200,
            citation_policy,
        },
        completion_policy,
    )
    .unwrap();

    QueryService::new(retriever, synthesizer)
}

async fn trigram_service(llm: Arc<FakeLlm>) -> QueryService {
    service_with(
        Arc::new(TrigramProvider::new(384)),
        llm,
        CitationPolicy::Declared,
    )
    .await
}

/// Each unit on its own axis; unknown text lands on the last one.
fn axis_embedder() -> ScriptedEmbedder {
    ScriptedEmbedder::new(4)
        .with("Trials shall be heard before the Crown.", vec![1.0, 0.0, 0.0, 0.0])
        .with("Theft is punishable by a fine.", vec![0.0, 1.0, 0.0, 0.0])
        .with("Tax evasion is punishable by banishment.", vec![0.0, 0.0, 1.0, 0.0])
        .with("silence", vec![0.0, 0.0, 0.0, 0.0])
        .with_fallback(vec![0.0, 0.0, 0.0, 1.0])
}

#[test]
fn test_loaded_units_have_unique_ids_and_text() {
    let units = units();
    assert_eq!(units.len(), 3);

    let ids: HashSet<&str> = units.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids.len(), units.len());
    assert!(units.iter().all(|u| !u.text.trim().is_empty()));
}

#[tokio::test]
async fn test_search_returns_at_most_k_indexed_units() {
    let service = trigram_service(Arc::new(FakeLlm::replying("unused"))).await;
    let indexed: HashSet<String> = service.units().map(|u| u.id.clone()).collect();

    for k in 1..=5 {
        let matches = service.search("punishable offences", k).await.unwrap();
        assert!(matches.len() <= k.min(indexed.len()));
        assert!(matches.iter().all(|m| indexed.contains(&m.unit.id)));
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    assert!(matches!(
        service.search("punishable offences", 0).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_retrieval_is_deterministic() {
    let first = trigram_service(Arc::new(FakeLlm::replying("unused"))).await;
    let second = trigram_service(Arc::new(FakeLlm::replying("unused"))).await;

    let query = "Who hears trials for theft?";
    let a: Vec<(String, f32)> = first
        .search(query, 3)
        .await
        .unwrap()
        .iter()
        .map(|m| (m.unit.id.clone(), m.score))
        .collect();
    let b: Vec<(String, f32)> = second
        .search(query, 3)
        .await
        .unwrap()
        .iter()
        .map(|m| (m.unit.id.clone(), m.score))
        .collect();

    assert_eq!(a, b);
}

#[tokio::test]
async fn test_theft_question_cites_law_4_1_2() {
    let llm = Arc::new(FakeLlm::replying(
        "Theft is punishable by a fine [Law 4.1.2].",
    ));
    let service = trigram_service(Arc::clone(&llm)).await;

    let matches = service
        .search("What is the penalty for theft?", 3)
        .await
        .unwrap();
    assert_eq!(matches[0].unit.id, "Law 4.1.2");

    let result = service
        .answer("What is the penalty for theft?")
        .await
        .unwrap();

    assert_eq!(result.disposition, Disposition::Answered);
    assert_eq!(result.query, "What is the penalty for theft?");
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].source, "Law 4.1.2");
    assert_eq!(result.citations[0].text, "Theft is punishable by a fine.");
    assert_eq!(llm.calls(), 1);

    let prompt = llm.last_request().unwrap().prompt;
    assert!(prompt.contains("What is the penalty for theft?"));
    assert!(prompt.contains("[Law 4.1.2]"));
}

#[tokio::test]
async fn test_paraphrased_theft_question_cites_misdemeanor_law() {
    let query = "what happens if I steal something worth $100?";
    let embedder = ScriptedEmbedder::new(2)
        .with("Theft of goods under $500 is a misdemeanor.", vec![0.9, 0.1])
        .with("Tax evasion is punishable by banishment.", vec![0.1, 0.9])
        .with(query, vec![0.8, 0.2]);
    let llm = Arc::new(FakeLlm::replying(
        "Stealing goods worth $100 is a misdemeanor [Law 4.1.2].",
    ));
    let service = build_service(
        parse(MISDEMEANORS),
        Arc::new(embedder),
        Arc::clone(&llm) as Arc<dyn LlmClient>,
        CitationPolicy::Declared,
        policy(),
    )
    .await;

    let matches = service.search(query, 3).await.unwrap();
    assert_eq!(matches[0].unit.id, "Law 4.1.2");
    assert!(matches[0].score >= 0.20);

    let result = service.answer(query).await.unwrap();
    assert_eq!(result.disposition, Disposition::Answered);
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].source, "Law 4.1.2");
    assert_eq!(
        result.citations[0].text,
        "Theft of goods under $500 is a misdemeanor."
    );
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_answer_matches_direct_synthesis() {
    let cases = [
        ("What is the penalty for theft?", vec![0.2, 1.0, 0.0, 0.0]),
        ("silence", vec![0.0, 0.0, 0.0, 0.0]),
    ];

    for (query, vector) in cases {
        let direct_llm = Arc::new(FakeLlm::replying("A fine [Law 4.1.2]."));
        let service_llm = Arc::new(FakeLlm::replying("A fine [Law 4.1.2]."));
        let direct = service_with(
            Arc::new(axis_embedder().with(query, vector.clone())),
            Arc::clone(&direct_llm),
            CitationPolicy::Declared,
        )
        .await;
        let service = service_with(
            Arc::new(axis_embedder().with(query, vector)),
            Arc::clone(&service_llm),
            CitationPolicy::Declared,
        )
        .await;

        let matches = direct
            .search(query, direct.retriever().default_k())
            .await
            .unwrap();
        let expected = direct.synthesizer().synthesize(query, &matches).await.unwrap();
        let actual = service.answer(query).await.unwrap();

        assert_eq!(actual.response, expected.response);
        assert_eq!(actual.citations, expected.citations);
        assert_eq!(actual.disposition, expected.disposition);
        assert_eq!(service_llm.calls(), direct_llm.calls());
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_model_is_upstream_error_after_retries() {
    let llm = Arc::new(StalledLlm::default());
    let retry = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(10),
        call_timeout: Duration::from_secs(1),
    };
    let service = build_service(
        units(),
        Arc::new(TrigramProvider::new(384)),
        Arc::clone(&llm) as Arc<dyn LlmClient>,
        CitationPolicy::Declared,
        retry,
    )
    .await;

    let err = service
        .answer("What is the penalty for theft?")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.is_retryable());
    assert!(err.user_message().contains("temporarily unavailable"));
    assert_eq!(llm.calls(), 3);
}

#[tokio::test]
async fn test_citations_point_at_existing_units() {
    let llm = Arc::new(FakeLlm::replying(
        "See [Law 4.1.1], [Law 4.1.2; Law 4.2.1] and [Law 7.7].",
    ));
    let embedder = ScriptedEmbedder::new(2)
        .with("Trials shall be heard before the Crown.", vec![1.0, 0.2])
        .with("Theft is punishable by a fine.", vec![1.0, 0.4])
        .with("Tax evasion is punishable by banishment.", vec![1.0, 0.6])
        .with_fallback(vec![1.0, 0.3]);
    let service = service_with(Arc::new(embedder), Arc::clone(&llm), CitationPolicy::Declared).await;
    let units = units();

    let result = service.answer("Which laws apply?").await.unwrap();
    assert_eq!(result.citations.len(), 3);

    for citation in &result.citations {
        let unit = units
            .iter()
            .find(|u| u.id == citation.source)
            .expect("citation refers to a loaded unit");
        assert!(unit.text.contains(&citation.text));
    }
}

#[tokio::test]
async fn test_empty_query_never_reaches_embedder() {
    let embedder = Arc::new(axis_embedder());
    let llm = Arc::new(FakeLlm::replying("unused"));
    let service = service_with(
        Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
        Arc::clone(&llm),
        CitationPolicy::Declared,
    )
    .await;
    let after_build = embedder.calls();

    for query in ["", "  \t\n"] {
        assert!(matches!(
            service.answer(query).await,
            Err(AppError::Validation(_))
        ));
    }

    assert_eq!(embedder.calls(), after_build);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_no_match_refuses_without_model_call() {
    let llm = Arc::new(FakeLlm::replying("unused"));
    let service = service_with(
        Arc::new(axis_embedder()),
        Arc::clone(&llm),
        CitationPolicy::Declared,
    )
    .await;

    let result = service.answer("silence").await.unwrap();

    assert_eq!(result.response, NO_RELEVANT_INFORMATION);
    assert!(result.citations.is_empty());
    assert!(result.is_refusal());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_weather_question_is_refused() {
    let llm = Arc::new(FakeLlm::replying("It will rain."));
    let service = service_with(
        Arc::new(axis_embedder()),
        Arc::clone(&llm),
        CitationPolicy::RelevanceFloor,
    )
    .await;

    let result = service
        .answer("What is the weather like today?")
        .await
        .unwrap();

    assert_eq!(result.response, NO_RELEVANT_INFORMATION);
    assert_eq!(result.disposition, Disposition::Refused);
    assert!(result.citations.is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_model_refusal_is_not_an_error() {
    let llm = Arc::new(FakeLlm::replying("INSUFFICIENT_CONTEXT"));
    let service = trigram_service(Arc::clone(&llm)).await;

    let result = service
        .answer("What is the penalty for theft?")
        .await
        .unwrap();

    assert_eq!(result.response, NOT_ENOUGH_INFORMATION);
    assert!(result.citations.is_empty());
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_swapped_embedder_is_config_error() {
    let built_with: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(384));
    let (index, _) = SimilarityIndex::build(units(), built_with.as_ref(), &BuildOptions::default())
        .await
        .unwrap();

    let other = Arc::new(axis_embedder());
    let retriever = Retriever::new(
        Arc::new(index),
        Arc::clone(&other) as Arc<dyn EmbeddingProvider>,
        RetrievalConfig::default(),
        policy(),
    );
    let synthesizer = AnswerSynthesizer::new(
        Arc::new(FakeLlm::replying("unused")),
        statute_prompt::builtin_prompt().unwrap(),
        SynthesisOptions {
            model: "test-model".to_string(),
            relevance_floor: 0.20,
            max_tokens: 512,
            max_excerpt_chars: 1200,
            citation_policy: CitationPolicy::Declared,
        },
        policy(),
    )
    .unwrap();
    let service = QueryService::new(retriever, synthesizer);

    let result = service.answer("What is the penalty for theft?").await;
    assert!(matches!(result, Err(AppError::Config(_))));
    assert_eq!(other.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_queries_share_one_index() {
    let llm = Arc::new(FakeLlm::replying("A fine [Law 4.1.2]."));
    let service = Arc::new(trigram_service(Arc::clone(&llm)).await);

    let queries = ["What is the penalty for theft?"; 4];
    let results = futures::future::join_all(queries.iter().map(|q| {
        let service = Arc::clone(&service);
        async move { service.answer(q).await }
    }))
    .await;

    for result in results {
        let result = result.unwrap();
        assert_eq!(result.citations[0].source, "Law 4.1.2");
    }
    assert_eq!(llm.calls(), 4);
}
