//! tally-sync: the async pipeline. Fetch-and-extract receipt amounts,
//! coordinate batches, fold uploaded bank statements into the ledger, and
//! sync pending source emails, all against store and blob-store seams.

pub mod batch;
pub mod blob;
pub mod error;
pub mod extract;
pub mod invoices;
pub mod orchestrator;
pub mod scheduler;
pub mod store;
pub mod upload;

pub use batch::batch_extract;
pub use blob::{BlobStore, MemoryBlob};
pub use error::{FetchError, StoreError, UploadError};
pub use extract::{
    AmountExtractor, DocumentLocation, ExtractionResult, PdfExtractor, extract_from_bytes,
    extract_from_text,
};
pub use invoices::{InvoiceScanReport, InvoiceScanner};
pub use orchestrator::{FailurePolicy, ItemOutcome, SyncOrchestrator, SyncReport};
pub use scheduler::SyncScheduler;
pub use store::{MemoryStore, Store};
pub use upload::{StatementUpload, UploadSummary};
