//! Command handlers for the statute CLI.

pub mod ask;
pub mod prompts;
pub mod search;
pub mod units;

pub use ask::AskCommand;
pub use prompts::PromptsCommand;
pub use search::SearchCommand;
pub use units::UnitsCommand;

use statute_core::{config::AppConfig, AppResult};
use statute_knowledge::QueryService;

/// Load the document and build the index for one command run.
pub(crate) async fn start_service(config: &AppConfig) -> AppResult<QueryService> {
    let (service, report) = QueryService::bootstrap(config).await?;

    for dropped in &report.dropped {
        tracing::warn!("Section '{}' is not searchable: {}", dropped.id, dropped.reason);
    }
    tracing::debug!(
        "Index built at {} (document digest {})",
        report.built_at.to_rfc3339(),
        report.document_digest
    );

    Ok(service)
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
