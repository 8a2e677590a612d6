//! Text Extractor: turns an uploaded document into plain text for prompting.
//!
//! Dispatch is by filename extension only (case-insensitive). Documents are fully
//! materialized in memory before parsing. A parse failure is terminal for that document
//! and surfaces as `AppError::UnsupportedOrCorruptDocument`; it is never degraded into
//! an empty string.

use std::path::Path;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;

pub mod pdf;
pub mod word;

/// An uploaded file: its bytes plus the client-supplied filename used as the type hint.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Bytes,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_filename(&self.filename)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
    Doc,
    /// Anything else: read as text on a best-effort basis.
    Unknown,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("txt") => DocumentKind::PlainText,
            Some("pdf") => DocumentKind::Pdf,
            Some("docx") => DocumentKind::Docx,
            Some("doc") => DocumentKind::Doc,
            _ => DocumentKind::Unknown,
        }
    }
}

/// Low-level parse failures. Converted to `AppError::UnsupportedOrCorruptDocument`
/// together with the filename at the `extract` boundary.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid UTF-8 text: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("ZIP container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("compound file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a Word 97-2003 document")]
    NotWordDocument,

    #[error("encrypted documents are not supported")]
    Encrypted,

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("malformed document: {0}")]
    Malformed(&'static str),
}

/// Extracts plain text from `document`, consuming it.
///
/// Empty input yields an empty string for every kind.
pub fn extract(document: UploadedDocument) -> Result<String, AppError> {
    let kind = document.kind();
    if document.bytes.is_empty() {
        debug!("'{}' is empty, nothing to extract", document.filename);
        return Ok(String::new());
    }

    let result = match kind {
        DocumentKind::PlainText => decode_plain_text(&document.bytes),
        DocumentKind::Pdf => pdf::extract_pdf(&document.bytes),
        DocumentKind::Docx => word::extract_docx(&document.bytes),
        DocumentKind::Doc => word::extract_doc(&document.bytes),
        DocumentKind::Unknown => Ok(String::from_utf8_lossy(&document.bytes).into_owned()),
    };

    let text = result.map_err(|e| AppError::corrupt(&document.filename, e))?;
    debug!(
        "Extracted {} chars from '{}' ({:?}, {} bytes)",
        text.chars().count(),
        document.filename,
        kind,
        document.bytes.len()
    );
    Ok(text)
}

/// Runs `extract` on the blocking pool; PDF and Word parsing are CPU-bound.
pub async fn extract_blocking(document: UploadedDocument) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extract(document))
        .await
        .map_err(|e| AppError::UnknownFailure(format!("extraction task failed: {e}")))?
}

fn decode_plain_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    Ok(std::str::from_utf8(bytes)?.to_string())
}
