//! Statement upload: fold an uploaded bank-statement CSV into the ledger.

use tally_core::{LedgerEntry, ReconcileOutcome, UploadedRow, reconcile};
use tally_ingest::ingest_csv;
use tracing::info;

use crate::error::UploadError;
use crate::store::Store;

/// Summary returned to the caller after a statement upload.
#[derive(Debug, Clone)]
pub struct UploadSummary {
    pub matched: usize,
    pub unmatched: usize,
    pub outcome: ReconcileOutcome,
}

/// Applies uploaded bank statements through the one reconciliation
/// matcher, so every entry point shares the same match key and merge
/// policy.
pub struct StatementUpload<S> {
    store: S,
}

impl<S: Store> StatementUpload<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest CSV text, reconcile against the current ledger, and persist
    /// both sides. Ingest and store failures abort the whole upload.
    pub async fn upload_csv(&self, text: &str) -> Result<UploadSummary, UploadError> {
        let rows = ingest_csv(text)?;
        let ledger = self.store.ledger().await?;
        let outcome = reconcile(&ledger, &rows);

        // Unmatched rows become new bank-statement entries; both sides are
        // remembered in the uploaded set so re-ingesting the same CSV is
        // detectable.
        for row in &outcome.unmatched {
            self.store.upsert_uploaded(UploadedRow::from(row)).await?;
            self.store.insert_entry(LedgerEntry::from_bank_row(row)).await?;
        }

        for matched in &outcome.matched {
            self.store
                .upsert_uploaded(UploadedRow::from(&matched.row))
                .await?;
            self.store
                .mark_bank_matched(&matched.row.invoice_number, matched.row.date, matched.row.amount)
                .await?;
        }

        info!(
            matched = outcome.matched.len(),
            unmatched = outcome.unmatched.len(),
            "statement upload complete"
        );
        Ok(UploadSummary {
            matched: outcome.matched.len(),
            unmatched: outcome.unmatched.len(),
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use tally_core::Source;

    fn seed_entry(invoice: &str, amount: f64) -> LedgerEntry {
        LedgerEntry {
            invoice_number: invoice.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            amount,
            description: "Shell Gas Station Receipt".to_string(),
            category: "Business Expense".to_string(),
            vendor: "Shell".to_string(),
            source: Source::Email,
            pdf_path: Some("inv-001.pdf".to_string()),
            bank_date: None,
            bank_amount: None,
        }
    }

    #[tokio::test]
    async fn test_matched_row_upgrades_source_without_new_entries() {
        let store = MemoryStore::new();
        store.insert_entry(seed_entry("INV-001", 45.0)).await.unwrap();

        let upload = StatementUpload::new(store);
        let summary = upload
            .upload_csv("Invoice Number,Date,Amount\nINV-001,2024-02-01,$45\n")
            .await
            .unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.unmatched, 0);

        let ledger = upload.store().ledger().await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].source, Source::Combined);
        assert_eq!(ledger[0].amount, 45.0);
        assert_eq!(ledger[0].bank_amount, Some(45.0));
        assert_eq!(
            ledger[0].bank_date,
            Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
        assert_eq!(ledger[0].description, "Shell Gas Station Receipt");

        let uploaded = upload.store().uploaded().await.unwrap();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].invoice_number, "INV-001");
    }

    #[tokio::test]
    async fn test_reupload_is_idempotent() {
        let store = MemoryStore::new();
        store.insert_entry(seed_entry("INV-001", 45.0)).await.unwrap();

        let upload = StatementUpload::new(store);
        let csv = "Invoice Number,Date,Amount\nINV-001,2024-02-01,$45\n";
        upload.upload_csv(csv).await.unwrap();
        let first = upload.store().ledger().await.unwrap();

        let summary = upload.upload_csv(csv).await.unwrap();
        assert_eq!(summary.matched, 1);
        let second = upload.store().ledger().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(upload.store().uploaded().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_rows_become_bank_entries() {
        let upload = StatementUpload::new(MemoryStore::new());
        let summary = upload
            .upload_csv("Invoice Number,Date,Amount\nINV-777,2024-03-05,12.34\n")
            .await
            .unwrap();
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.unmatched, 1);

        let ledger = upload.store().ledger().await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].invoice_number, "INV-777");
        assert_eq!(ledger[0].source, Source::BankStatement);
        assert_eq!(ledger[0].vendor, "Unknown");
        assert!(ledger[0].description.contains("INV-777"));
    }

    #[tokio::test]
    async fn test_bad_csv_aborts_upload() {
        let upload = StatementUpload::new(MemoryStore::new());
        let err = upload
            .upload_csv("Invoice Number,Date\nINV-001,2024-02-01\n")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Ingest(_)));
        assert!(upload.store().ledger().await.unwrap().is_empty());
    }
}
