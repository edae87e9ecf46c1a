//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use statute_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the prompt compiled into the crate.
pub const BUILTIN_PROMPT_ID: &str = "legal.answer.grounded";

const BUILTIN_PROMPT_YAML: &str = include_str!("../prompts/legal.answer.grounded.yml");

/// Load a prompt definition by ID.
///
/// Looks for `<id>.yml` in the workspace's `.statute/prompts/` directory
/// first, so operators can tune wording without rebuilding. The built-in
/// `legal.answer.grounded` definition is used when no override exists.
///
/// # Example
/// ```no_run
/// use statute_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "legal.answer.grounded")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        if prompt_id == BUILTIN_PROMPT_ID {
            tracing::debug!("Using built-in prompt: {}", prompt_id);
            return builtin_prompt();
        }
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_prompt(&contents)
        .map_err(|e| AppError::Prompt(format!("Invalid prompt {:?}: {}", prompt_file, e)))?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// The built-in grounded-answer prompt.
pub fn builtin_prompt() -> AppResult<PromptDefinition> {
    parse_prompt(BUILTIN_PROMPT_YAML)
}

/// List all prompt IDs available in the workspace, plus the built-in one.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids = vec![BUILTIN_PROMPT_ID.to_string()];
    let dir = prompts_dir(workspace_path);

    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if stem != BUILTIN_PROMPT_ID {
                        prompt_ids.push(stem.to_string());
                    }
                }
            }
        }
    }

    prompt_ids[1..].sort();
    Ok(prompt_ids)
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".statute").join("prompts")
}

fn parse_prompt(contents: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML: {}", e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
