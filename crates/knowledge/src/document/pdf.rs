//! Text extraction from PDF law books.

use lopdf::Document;
use statute_core::{AppError, AppResult};
use std::path::Path;

/// Extract the text of every page, in page order, one line per text block.
///
/// Leading indentation is dropped so numbered sections start their line the
/// same way they do in the Markdown rendering.
///
/// # Errors
/// `AppError::Load` if the file is not a readable PDF, has no pages, or its
/// text cannot be decoded.
pub fn extract_text(path: &Path) -> AppResult<String> {
    let document = Document::load(path)
        .map_err(|e| AppError::Load(format!("Failed to open PDF {:?}: {}", path, e)))?;

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(AppError::Load(format!("PDF {:?} has no pages", path)));
    }

    let text = document
        .extract_text(&pages)
        .map_err(|e| AppError::Load(format!("Failed to extract text from {:?}: {}", path, e)))?;

    tracing::debug!("Extracted {} characters from {} PDF pages", text.len(), pages.len());

    Ok(text
        .lines()
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n"))
}
