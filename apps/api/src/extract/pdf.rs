//! PDF text extraction.
//!
//! The whole document is held in memory; `pdf-extract` has no streaming mode.

use std::fmt::Display;
use std::panic::UnwindSafe;

use tracing::warn;

use super::ExtractError;

/// Extracts the text layer of a PDF held in memory.
///
/// `pdf-extract` panics on some malformed inputs instead of returning an error,
/// so the call is isolated with `catch_unwind` and the panic reported as a parse failure.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    run_parser(|| pdf_extract::extract_text_from_mem(bytes))
}

fn run_parser<F, E>(parse: F) -> Result<String, ExtractError>
where
    F: FnOnce() -> Result<String, E> + UnwindSafe,
    E: Display,
{
    match std::panic::catch_unwind(parse) {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => {
            warn!("PDF parser panicked on malformed input; reporting as corrupt");
            Err(ExtractError::Pdf("parser aborted on malformed input".to_string()))
        }
    }
}
