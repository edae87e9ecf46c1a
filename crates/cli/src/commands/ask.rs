//! Ask command handler.
//!
//! Answers one question from the document and prints the cited sections.

use super::{print_json, start_service};
use clap::Args;
use statute_core::{config::AppConfig, AppResult};
use statute_knowledge::{QueryResult, Retriever};

/// Answer a question from the document, with citations
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Number of sections to retrieve before filtering by relevance
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = Retriever::validate_k(top_k)?;
        }

        let service = start_service(&config).await?;
        let result = service.answer(&self.query).await?;

        if self.json {
            print_json(&result)
        } else {
            println!("{}", render(&result));
            Ok(())
        }
    }
}

fn render(result: &QueryResult) -> String {
    let mut out = result.response.clone();

    if !result.citations.is_empty() {
        out.push_str("\n\nCitations:");
        for citation in &result.citations {
            out.push_str(&format!("\n  [{}] {}", citation.source, citation.text));
        }
    }

    out
}
