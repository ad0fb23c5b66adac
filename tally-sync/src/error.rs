use thiserror::Error;

/// A receipt PDF could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch PDF: {status} {status_text}")]
    Status { status: u16, status_text: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// A persistent-store or blob-store operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate invoice number: {invoice_number}")]
    DuplicateKey { invoice_number: String },

    #[error("no such blob: {path}")]
    BlobNotFound { path: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// A whole-statement upload failed. Ingest and store failures here are
/// fatal for the upload; there is no partial recovery.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Ingest(#[from] tally_ingest::IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
