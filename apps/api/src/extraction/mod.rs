//! Document text extraction for uploaded resumes.
//!
//! The format is chosen by file extension. Parsing is CPU-bound and some parsers
//! panic on malformed input, so it runs on the blocking pool and a panic is
//! reported as `ExtractionOutcome::Failed` for that file only.

mod docx;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

/// Result of extracting text from one uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Non-blank text was extracted.
    Extracted(String),
    /// The document parsed but contained no text (e.g. a scanned PDF).
    Empty,
    /// The file extension is not a supported document format.
    Unsupported,
    /// The parser rejected the document.
    Failed(String),
}

impl ExtractionOutcome {
    pub fn status(&self) -> ExtractionStatus {
        match self {
            ExtractionOutcome::Extracted(_) => ExtractionStatus::Extracted,
            ExtractionOutcome::Empty => ExtractionStatus::Empty,
            ExtractionOutcome::Unsupported => ExtractionStatus::Unsupported,
            ExtractionOutcome::Failed(_) => ExtractionStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Extracted,
    Empty,
    Unsupported,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    /// Detects the document kind from the filename's extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" | "md" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

/// Turns uploaded file bytes into plain text. Never fails the caller:
/// every problem is expressed as an `ExtractionOutcome`.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, filename: &str, bytes: Bytes) -> ExtractionOutcome;
}

/// Default extractor: PDF via `pdf-extract`, DOCX via `docx-rs`, plain text as UTF-8.
pub struct DocumentExtractor;

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, filename: &str, bytes: Bytes) -> ExtractionOutcome {
        let Some(kind) = DocumentKind::from_filename(filename) else {
            warn!(filename, "Unsupported document format");
            return ExtractionOutcome::Unsupported;
        };

        let result = tokio::task::spawn_blocking(move || extract_sync(kind, &bytes)).await;

        let outcome = match result {
            Ok(Ok(text)) if text.trim().is_empty() => ExtractionOutcome::Empty,
            Ok(Ok(text)) => ExtractionOutcome::Extracted(text),
            Ok(Err(reason)) => ExtractionOutcome::Failed(reason),
            Err(join_err) => ExtractionOutcome::Failed(format!("parser aborted: {join_err}")),
        };

        match &outcome {
            ExtractionOutcome::Extracted(text) => {
                debug!(filename, characters = text.chars().count(), "Extracted text")
            }
            ExtractionOutcome::Empty => warn!(filename, "Document contains no extractable text"),
            ExtractionOutcome::Failed(reason) => {
                warn!(filename, %reason, "Error extracting text")
            }
            ExtractionOutcome::Unsupported => {}
        }

        outcome
    }
}

fn extract_sync(kind: DocumentKind, bytes: &[u8]) -> Result<String, String> {
    match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| format!("PDF extraction error: {e}")),
        DocumentKind::Docx => docx::extract_text(bytes),
        DocumentKind::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}
