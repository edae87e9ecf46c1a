//! Legal document loading.
//!
//! Reads the law book once at startup and turns it into [`SourceUnit`]s.
//! Accepts the PDF itself or its Markdown or plain-text rendering.

pub mod normalize;
pub mod pdf;
pub mod sections;

pub use normalize::Normalizer;
pub use sections::SectionParser;

use crate::types::SourceUnit;
use statute_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Document format classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Markdown or plain text, read as UTF-8
    Text,
    Pdf,
    Unsupported,
}

impl DocumentFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("md") | Some("markdown") | Some("txt") => Self::Text,
            Some("pdf") => Self::Pdf,
            _ => Self::Unsupported,
        }
    }
}

/// Load a legal document and split it into units.
///
/// # Errors
/// `AppError::Load` if the file is missing, unreadable, of an unsupported
/// type, or contains no numbered sections.
pub fn load_document(path: &Path) -> AppResult<Vec<SourceUnit>> {
    let content = match DocumentFormat::from_path(path) {
        DocumentFormat::Text => fs::read_to_string(path)
            .map_err(|e| AppError::Load(format!("Failed to read document {:?}: {}", path, e)))?,
        DocumentFormat::Pdf => pdf::extract_text(path)?,
        DocumentFormat::Unsupported => {
            let kind = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("<none>");
            return Err(AppError::Load(format!(
                "Unsupported document type '{}' for {:?}; expected .pdf, .md, .markdown or .txt",
                kind, path
            )));
        }
    };

    let units = SectionParser::new()?.parse(&content);

    if units.is_empty() {
        return Err(AppError::Load(format!(
            "No numbered sections found in {:?}",
            path
        )));
    }

    tracing::info!("Loaded {} units from {:?}", units.len(), path);
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::write_pdf;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_path(Path::new("laws.md")), DocumentFormat::Text);
        assert_eq!(DocumentFormat::from_path(Path::new("LAWS.MD")), DocumentFormat::Text);
        assert_eq!(DocumentFormat::from_path(Path::new("laws.txt")), DocumentFormat::Text);
        assert_eq!(DocumentFormat::from_path(Path::new("laws.pdf")), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("Laws.PDF")), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("laws.docx")), DocumentFormat::Unsupported);
        assert_eq!(DocumentFormat::from_path(Path::new("laws")), DocumentFormat::Unsupported);
    }

    #[test]
    fn test_load_markdown_document() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "laws.md",
            "**1.** **Peace**\n\n1.1. Theft is punishable by hanging.\n1.2. Tax evasion is punishable by banishment.\n",
        );

        let units = load_document(&path).unwrap();
        assert_eq!(units.len(), 2);

        let ids: HashSet<&str> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids.len(), units.len());
        assert!(units.iter().all(|u| !u.text.is_empty()));
    }

    #[test]
    fn test_missing_document_is_load_error() {
        let dir = TempDir::new().unwrap();
        let result = load_document(&dir.path().join("absent.md"));
        assert!(matches!(result, Err(AppError::Load(_))));
    }

    #[test]
    fn test_load_pdf_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("laws.pdf");
        write_pdf(
            &path,
            &[
                "4.1.1. Trials shall be heard before the Crown.",
                "4.1.2. Theft of goods under $500 is a misde-",
                "meanor.",
                "4.2.1. Tax evasion is punishable by banishment.",
            ],
        );

        let units = load_document(&path).unwrap();
        let ids: Vec<&str> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["Law 4.1.1", "Law 4.1.2", "Law 4.2.1"]);
        assert_eq!(units[1].text, "Theft of goods under $500 is a misdemeanor.");
    }

    #[test]
    fn test_corrupt_pdf_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "laws.pdf", "%PDF-1.7");
        assert!(matches!(load_document(&path), Err(AppError::Load(_))));
    }

    #[test]
    fn test_unsupported_type_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "laws.docx", "PK");
        match load_document(&path) {
            Err(AppError::Load(msg)) => assert!(msg.contains("'docx'")),
            other => panic!("Expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_document_without_sections_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "notes.txt", "Nothing numbered in here.\n");
        assert!(matches!(load_document(&path), Err(AppError::Load(_))));
    }
}
