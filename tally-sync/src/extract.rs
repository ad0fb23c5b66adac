//! PDF amount extraction over HTTP and blob storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tally_ingest::{aggressive_amount, largest_dollar_amount, pdf_text};

use crate::blob::BlobStore;
use crate::error::FetchError;

/// Where a receipt PDF lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLocation {
    Url(String),
    StoragePath(String),
}

impl DocumentLocation {
    /// Trailing path segment, recorded on ledger entries as `pdf_path`.
    pub fn file_name(&self) -> String {
        let raw = match self {
            Self::Url(s) | Self::StoragePath(s) => s.as_str(),
        };
        raw.rsplit('/').next().unwrap_or(raw).to_string()
    }
}

/// Outcome of one extraction. Failure is a normal, reportable outcome:
/// callers get `success = false` instead of an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub raw_text: String,
    /// Best-guess total; `0.0` when nothing was found.
    pub amount: f64,
    pub success: bool,
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            raw_text: String::new(),
            amount: 0.0,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Produces an [`ExtractionResult`] for a document, wherever it lives.
#[async_trait]
pub trait AmountExtractor: Send + Sync {
    async fn extract(&self, location: &DocumentLocation) -> ExtractionResult;
}

/// Extractor backed by HTTP fetches and the blob seam.
pub struct PdfExtractor {
    client: reqwest::Client,
    blobs: Arc<dyn BlobStore>,
    fetch_timeout: Duration,
}

impl PdfExtractor {
    pub fn new(blobs: Arc<dyn BlobStore>, fetch_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            blobs,
            fetch_timeout,
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let timeout = |seconds| FetchError::Timeout { seconds };
        let seconds = self.fetch_timeout.as_secs();

        let response = tokio::time::timeout(self.fetch_timeout, self.client.get(url).send())
            .await
            .map_err(|_| timeout(seconds))??;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        let bytes = tokio::time::timeout(self.fetch_timeout, response.bytes())
            .await
            .map_err(|_| timeout(seconds))??;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AmountExtractor for PdfExtractor {
    async fn extract(&self, location: &DocumentLocation) -> ExtractionResult {
        let bytes = match location {
            DocumentLocation::Url(url) => self.fetch(url).await.map_err(|e| e.to_string()),
            DocumentLocation::StoragePath(path) => {
                self.blobs.download(path).await.map_err(|e| e.to_string())
            }
        };
        match bytes {
            Ok(bytes) => extract_from_bytes(&bytes),
            Err(error) => ExtractionResult::failure(error),
        }
    }
}

/// Decode a PDF byte stream and scan its text for the most likely total.
pub fn extract_from_bytes(bytes: &[u8]) -> ExtractionResult {
    match pdf_text::extract_text(bytes) {
        Ok(text) => extract_from_text(text),
        Err(e) => ExtractionResult::failure(e.to_string()),
    }
}

/// Scan already-extracted text: the primary dollar-figure scan, then the
/// aggressive fallback when it finds nothing.
pub fn extract_from_text(text: String) -> ExtractionResult {
    let scanned = largest_dollar_amount(&text).and_then(|primary| match primary {
        Some(amount) => Ok(Some(amount)),
        None => aggressive_amount(&text),
    });

    match scanned {
        Ok(Some(amount)) => ExtractionResult {
            raw_text: text,
            amount,
            success: true,
            error: None,
        },
        Ok(None) => ExtractionResult {
            raw_text: text,
            amount: 0.0,
            success: false,
            error: None,
        },
        Err(e) => ExtractionResult {
            raw_text: text,
            amount: 0.0,
            success: false,
            error: Some(e.to_string()),
        },
    }
}
