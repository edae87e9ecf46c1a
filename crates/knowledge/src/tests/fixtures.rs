//! Deterministic fakes for the embedding and completion capabilities.

use crate::embeddings::EmbeddingProvider;
use crate::types::{SourceUnit, UnitOrigin};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use statute_core::{AppError, AppResult};
use statute_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Build a unit with id `Law <section>`.
pub(crate) fn unit(section: &str, text: &str) -> SourceUnit {
    SourceUnit {
        id: format!("Law {}", section),
        text: text.to_string(),
        origin: UnitOrigin {
            section: section.to_string(),
            title: None,
            line: 1,
        },
    }
}

/// Embedder returning fixed vectors per exact text.
///
/// Unknown texts map to the `fallback` vector when one is set and fail
/// otherwise.
#[derive(Debug)]
pub(crate) struct ScriptedEmbedder {
    dimensions: usize,
    model: String,
    vectors: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
    fallback: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model: "scripted-v1".to_string(),
            vectors: HashMap::new(),
            failing: HashSet::new(),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub(crate) fn failing(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub(crate) fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    pub(crate) fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(text) {
            return Err(AppError::upstream(format!("scripted failure for '{}'", text)));
        }

        self.vectors
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| AppError::upstream_fatal(format!("no scripted vector for '{}'", text)))
    }
}

/// Completion client replaying scripted replies and recording requests.
#[derive(Debug, Default)]
pub(crate) struct FakeLlm {
    replies: Mutex<Vec<AppResult<String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl FakeLlm {
    /// Always answer with `reply`.
    pub(crate) fn replying(reply: &str) -> Self {
        Self::scripted(vec![Ok(reply.to_string())])
    }

    /// Replay `replies` in order; the last one repeats.
    pub(crate) fn scripted(replies: Vec<AppResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.len() {
                0 => Ok(String::new()),
                1 => clone_reply(&replies[0]),
                _ => replies.remove(0),
            }
        };

        reply.map(|content| LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }
}

fn clone_reply(reply: &AppResult<String>) -> AppResult<String> {
    match reply {
        Ok(content) => Ok(content.clone()),
        Err(AppError::Upstream { message, retryable }) => Err(AppError::Upstream {
            message: message.clone(),
            retryable: *retryable,
        }),
        Err(other) => Err(AppError::Config(other.to_string())),
    }
}

/// Completion client whose calls never finish; counts attempts.
#[derive(Debug, Default)]
pub(crate) struct StalledLlm {
    calls: AtomicUsize,
}

impl StalledLlm {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for StalledLlm {
    fn provider_name(&self) -> &str {
        "stalled"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(AppError::upstream("stalled client woke up"))
    }
}

/// Write a one-page PDF with one text block per line.
pub(crate) fn write_pdf(path: &Path, lines: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut operations = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let y = 750 - 20 * idx as i64;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
        operations.push(Operation::new("Td", vec![50.into(), y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
