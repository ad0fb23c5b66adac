//! Stored-invoice processing: scan the blob store for receipt PDFs and
//! fold them into the ledger, independent of any email record.

use chrono::Utc;
use tally_core::{LedgerEntry, Source, vendor_from_filename};
use tracing::{info, warn};

use crate::batch::batch_extract;
use crate::blob::BlobStore;
use crate::error::StoreError;
use crate::extract::{AmountExtractor, DocumentLocation};
use crate::store::Store;

/// Per-file outcome of a storage scan.
#[derive(Debug, Clone)]
pub struct InvoiceOutcome {
    pub file: String,
    pub amount: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceScanReport {
    pub processed: usize,
    pub errors: usize,
    pub details: Vec<InvoiceOutcome>,
}

/// Processes every PDF under a storage prefix. The invoice number is the
/// filename without its extension, so rescanning the same bucket upserts
/// rather than duplicates.
pub struct InvoiceScanner<S, E> {
    store: S,
    extractor: E,
    max_concurrency: usize,
}

impl<S: Store, E: AmountExtractor> InvoiceScanner<S, E> {
    pub fn new(store: S, extractor: E, max_concurrency: usize) -> Self {
        Self {
            store,
            extractor,
            max_concurrency,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn process_all(
        &self,
        blobs: &dyn BlobStore,
        prefix: &str,
    ) -> Result<InvoiceScanReport, StoreError> {
        let files: Vec<String> = blobs
            .list(prefix)
            .await?
            .into_iter()
            .filter(|name| name.to_lowercase().ends_with(".pdf"))
            .collect();
        if files.is_empty() {
            info!(prefix, "no invoice files in storage");
            return Ok(InvoiceScanReport::default());
        }

        let locations: Vec<DocumentLocation> = files
            .iter()
            .map(|file| DocumentLocation::StoragePath(file.clone()))
            .collect();
        let extractions =
            batch_extract(&self.extractor, &locations, self.max_concurrency).await;

        let mut report = InvoiceScanReport::default();
        for (file, extraction) in files.into_iter().zip(extractions) {
            if !(extraction.success && extraction.amount > 0.0) {
                warn!(file = %file, "no amount extracted from stored invoice");
                report.errors += 1;
                report.details.push(InvoiceOutcome {
                    file,
                    amount: None,
                    error: Some(
                        extraction
                            .error
                            .unwrap_or_else(|| "no amount found".to_string()),
                    ),
                });
                continue;
            }

            let location = DocumentLocation::StoragePath(file.clone());
            let file_name = location.file_name();
            let invoice_number = file_name
                .strip_suffix(".pdf")
                .or_else(|| file_name.strip_suffix(".PDF"))
                .unwrap_or(&file_name)
                .to_string();

            let entry = LedgerEntry {
                invoice_number: invoice_number.clone(),
                date: Utc::now().date_naive(),
                amount: extraction.amount,
                description: format!("Invoice {invoice_number}"),
                category: "Expense".to_string(),
                vendor: vendor_from_filename(&file_name),
                source: Source::Email,
                pdf_path: Some(file.clone()),
                bank_date: None,
                bank_amount: None,
            };

            match self.store.upsert_entry(entry).await {
                Ok(_) => {
                    report.processed += 1;
                    report.details.push(InvoiceOutcome {
                        file,
                        amount: Some(extraction.amount),
                        error: None,
                    });
                }
                Err(e) => {
                    report.errors += 1;
                    report.details.push(InvoiceOutcome {
                        file,
                        amount: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!(
            processed = report.processed,
            errors = report.errors,
            "storage scan complete"
        );
        Ok(report)
    }
}
