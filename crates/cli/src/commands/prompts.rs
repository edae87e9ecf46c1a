//! Prompts command handler.

use super::print_json;
use clap::Args;
use serde::Serialize;
use statute_core::{config::AppConfig, AppResult};
use statute_prompt::list_prompts;

/// List prompt definitions available to the answer synthesizer
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct PromptRow {
    id: String,
    active: bool,
}

impl PromptsCommand {
    /// Execute the prompts command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        let rows = prompt_rows(config)?;

        if self.json {
            return print_json(&rows);
        }

        for row in &rows {
            let marker = if row.active { "*" } else { " " };
            println!("{} {}", marker, row.id);
        }

        Ok(())
    }
}

fn prompt_rows(config: &AppConfig) -> AppResult<Vec<PromptRow>> {
    let active = config.synthesis.prompt_id.as_str();

    Ok(list_prompts(&config.workspace)?
        .into_iter()
        .map(|id| PromptRow {
            active: id == active,
            id,
        })
        .collect())
}
