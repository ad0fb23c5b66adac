//! PDF-to-text decoding.

use thiserror::Error;

/// The byte stream could not be decoded as a PDF.
#[derive(Debug, Error)]
#[error("failed to decode PDF: {0}")]
pub struct PdfTextError(String);

/// Decode a PDF byte stream into plain text.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfTextError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| PdfTextError(e.to_string()))
}
