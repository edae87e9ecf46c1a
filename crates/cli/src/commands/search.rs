//! Search command handler.
//!
//! Retrieval only: shows which sections a query lands on and how closely.

use super::{print_json, start_service};
use clap::Args;
use serde::Serialize;
use statute_core::{config::AppConfig, AppResult};
use statute_knowledge::{RetrievedMatch, Retriever};

/// Show the best matching sections for a query, with scores
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of sections to show (default: retrieval.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchRow<'a> {
    id: &'a str,
    score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    line: usize,
    text: &'a str,
}

impl<'a> From<&RetrievedMatch<'a>> for MatchRow<'a> {
    fn from(m: &RetrievedMatch<'a>) -> Self {
        Self {
            id: &m.unit.id,
            score: m.score,
            title: m.unit.origin.title.as_deref(),
            line: m.unit.origin.line,
            text: &m.unit.text,
        }
    }
}

impl SearchCommand {
    /// Execute the search command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let top_k = self.top_k.map(Retriever::validate_k).transpose()?;
        let service = start_service(config).await?;
        let k = top_k.unwrap_or_else(|| service.retriever().default_k());
        let matches = service.search(&self.query, k).await?;

        let rows: Vec<MatchRow<'_>> = matches.iter().map(MatchRow::from).collect();

        if self.json {
            return print_json(&rows);
        }

        if rows.is_empty() {
            println!("No matching sections.");
        }
        for row in &rows {
            println!("{:>6.3}  {}  {}", row.score, row.id, row.text);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statute_core::AppError;

    #[tokio::test]
    async fn test_zero_top_k_rejected_before_loading() {
        let cmd = SearchCommand {
            query: "theft".to_string(),
            top_k: Some(0),
            json: true,
        };

        let result = cmd.execute(&AppConfig::default()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
