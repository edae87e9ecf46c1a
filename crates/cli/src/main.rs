//! Statute CLI
//!
//! Main entry point for the statute command-line tool.
//! Answers questions about a legal document with cited sections.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, PromptsCommand, SearchCommand, UnitsCommand};
use statute_core::{config::AppConfig, logging, AppError, AppResult, ErrorKind};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

/// Statute - grounded question answering over a legal document
#[derive(Parser, Debug)]
#[command(name = "statute")]
#[command(about = "Ask questions about a legal document and get cited answers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "STATUTE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "STATUTE_CONFIG")]
    config: Option<PathBuf>,

    /// Legal document to load (.pdf, .md, .markdown or .txt)
    #[arg(short, long, global = true, env = "STATUTE_DOCUMENT")]
    document: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Completion provider (ollama, openai)
    #[arg(short, long, global = true, env = "STATUTE_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "STATUTE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question from the document, with citations
    Ask(AskCommand),

    /// Show the best matching sections for a query, with scores
    Search(SearchCommand),

    /// List the sections loaded from the document
    Units(UnitsCommand),

    /// List available prompt definitions
    Prompts(PromptsCommand),
}

/// Process exit code for each error kind.
fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Validation => 2,
        ErrorKind::Load => 3,
        ErrorKind::Config => 4,
        ErrorKind::Upstream => 5,
    }
}

/// Text printed to stderr for a failed run.
///
/// Failures before logging is up (bad config, missing workspace) would
/// otherwise leave no trace of the underlying cause.
fn failure_report(e: &AppError, logging_ready: bool) -> String {
    if logging_ready {
        format!("Error: {}", e.user_message())
    } else {
        format!("Error: {}\nCaused by: {}", e.user_message(), e)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                let logging_ready = tracing::dispatcher::has_been_set();
                if logging_ready {
                    tracing::error!(kind = e.kind().as_str(), "Command failed: {}", e);
                }
                eprintln!("{}", failure_report(&e, logging_ready));
                ExitCode::from(exit_code(e.kind()))
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; abandoning in-flight requests");
            ExitCode::from(130)
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.config,
        cli.document,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    config.json_logs |= cli.json_logs;

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.json_logs)?;

    tracing::info!("Statute CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Document: {:?}", config.document_path());
    tracing::debug!("Provider: {} ({})", config.provider, config.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Search(_) => "search",
        Commands::Units(_) => "units",
        Commands::Prompts(_) => "prompts",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Search(cmd) => cmd.execute(&config).await,
            Commands::Units(cmd) => cmd.execute(&config).await,
            Commands::Prompts(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    if result.is_ok() {
        tracing::info!("Command completed successfully");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_ask_with_global_flags() {
        let cli = Cli::try_parse_from([
            "statute",
            "ask",
            "What is the penalty for theft?",
            "--top-k",
            "5",
            "--document",
            "laws.md",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.document, Some(PathBuf::from("laws.md")));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.query, "What is the penalty for theft?");
                assert_eq!(cmd.top_k, Some(5));
                assert!(cmd.json);
            }
            other => panic!("Expected ask, got {:?}", other),
        }
    }

    #[test]
    fn test_early_failure_report_includes_cause() {
        let err = AppError::Config("Workspace directory does not exist: \"/nope\"".to_string());

        let early = failure_report(&err, false);
        assert!(early.contains("misconfigured"));
        assert!(early.contains("Workspace directory does not exist"));

        let logged = failure_report(&err, true);
        assert!(!logged.contains("Workspace directory does not exist"));
    }

    #[test]
    fn test_parses_prompts_command() {
        let cli = Cli::try_parse_from(["statute", "prompts", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Prompts(PromptsCommand { json: true })));
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            exit_code(ErrorKind::Validation),
            exit_code(ErrorKind::Load),
            exit_code(ErrorKind::Config),
            exit_code(ErrorKind::Upstream),
        ];
        assert_eq!(codes, [2, 3, 4, 5]);
    }
}
