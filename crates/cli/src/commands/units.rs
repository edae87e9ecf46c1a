//! Units command handler.

use super::print_json;
use clap::Args;
use statute_core::{config::AppConfig, AppResult};
use statute_knowledge::load_document;

/// List the sections parsed from the document
#[derive(Args, Debug)]
pub struct UnitsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl UnitsCommand {
    /// Execute the units command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing units command");

        // Parsing only; listing sections needs no embeddings
        let units = load_document(&config.document_path())?;

        if self.json {
            return print_json(&units);
        }

        for unit in &units {
            match &unit.origin.title {
                Some(title) => println!("{} ({}, line {})", unit.id, title, unit.origin.line),
                None => println!("{} (line {})", unit.id, unit.origin.line),
            }
            println!("    {}", unit.text);
        }
        println!("{} sections", units.len());

        Ok(())
    }
}
