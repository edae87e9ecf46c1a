//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use serde::Serialize;
use statute_core::{AppError, AppResult};

/// Build a prompt from a definition and template data.
///
/// Both the system and user templates are rendered against the same
/// `data`. HTML escaping is disabled: excerpts are plain legal text.
///
/// # Example
/// ```no_run
/// use statute_prompt::{build_prompt, load_prompt};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_prompt(Path::new("."), "legal.answer.grounded")?;
/// let data = serde_json::json!({ "query": "What is theft?", "excerpts": [] });
/// let built = build_prompt(&def, &data)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt<T: Serialize>(definition: &PromptDefinition, data: &T) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let handlebars = registry(definition)?;

    let system = match definition.system {
        Some(_) => Some(
            handlebars
                .render("system", data)
                .map_err(|e| AppError::Prompt(format!("Failed to render system template: {}", e)))?,
        ),
        None => None,
    };

    let user = handlebars
        .render("user", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(BuiltPrompt {
        system,
        user,
        source_prompt_id: definition.id.clone(),
    })
}

fn registry(definition: &PromptDefinition) -> AppResult<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    if let Some(system) = &definition.system {
        handlebars
            .register_template_string("system", system)
            .map_err(|e| AppError::Prompt(format!("Failed to register system template: {}", e)))?;
    }

    handlebars
        .register_template_string("user", &definition.template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    Ok(handlebars)
}
