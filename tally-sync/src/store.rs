//! Persistent-store seam.
//!
//! The pipeline needs only a handful of row operations; anything that can
//! provide them (a hosted database, a JSON file, an in-memory map) can
//! back it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tally_core::{EmailRecord, LedgerEntry, UploadedRow};
use tokio::sync::RwLock;

use crate::error::StoreError;

#[async_trait]
pub trait Store: Send + Sync {
    /// All source emails.
    async fn emails(&self) -> Result<Vec<EmailRecord>, StoreError>;

    /// Current ledger entries.
    async fn ledger(&self) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Insert a new entry; fails with [`StoreError::DuplicateKey`] if the
    /// invoice number is already present.
    async fn insert_entry(&self, entry: LedgerEntry) -> Result<(), StoreError>;

    /// Insert or replace by invoice number, returning the replaced entry
    /// so callers can log a last-writer-wins replacement.
    async fn upsert_entry(&self, entry: LedgerEntry)
    -> Result<Option<LedgerEntry>, StoreError>;

    /// Upgrade a matched entry's source tag and record the bank figures
    /// as evidence. Returns the number of entries updated.
    async fn mark_bank_matched(
        &self,
        invoice_number: &str,
        bank_date: NaiveDate,
        bank_amount: f64,
    ) -> Result<u64, StoreError>;

    /// Remember an ingested bank row; re-ingesting the same invoice number
    /// overwrites rather than duplicates.
    async fn upsert_uploaded(&self, row: UploadedRow) -> Result<(), StoreError>;

    /// Bank rows remembered from previous uploads.
    async fn uploaded(&self) -> Result<Vec<UploadedRow>, StoreError>;
}

/// Shared handles delegate, so one store can back several services.
#[async_trait]
impl<T: Store + ?Sized> Store for std::sync::Arc<T> {
    async fn emails(&self) -> Result<Vec<EmailRecord>, StoreError> {
        (**self).emails().await
    }

    async fn ledger(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).ledger().await
    }

    async fn insert_entry(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        (**self).insert_entry(entry).await
    }

    async fn upsert_entry(
        &self,
        entry: LedgerEntry,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        (**self).upsert_entry(entry).await
    }

    async fn mark_bank_matched(
        &self,
        invoice_number: &str,
        bank_date: NaiveDate,
        bank_amount: f64,
    ) -> Result<u64, StoreError> {
        (**self).mark_bank_matched(invoice_number, bank_date, bank_amount).await
    }

    async fn upsert_uploaded(&self, row: UploadedRow) -> Result<(), StoreError> {
        (**self).upsert_uploaded(row).await
    }

    async fn uploaded(&self) -> Result<Vec<UploadedRow>, StoreError> {
        (**self).uploaded().await
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    emails: Vec<EmailRecord>,
    ledger: HashMap<String, LedgerEntry>,
    uploaded: HashMap<String, UploadedRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_emails(&self, emails: Vec<EmailRecord>) {
        self.inner.write().await.emails.extend(emails);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn emails(&self) -> Result<Vec<EmailRecord>, StoreError> {
        Ok(self.inner.read().await.emails.clone())
    }

    async fn ledger(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut entries: Vec<LedgerEntry> =
            self.inner.read().await.ledger.values().cloned().collect();
        entries.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));
        Ok(entries)
    }

    async fn insert_entry(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.ledger.contains_key(&entry.invoice_number) {
            return Err(StoreError::DuplicateKey {
                invoice_number: entry.invoice_number,
            });
        }
        inner.ledger.insert(entry.invoice_number.clone(), entry);
        Ok(())
    }

    async fn upsert_entry(
        &self,
        entry: LedgerEntry,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.ledger.insert(entry.invoice_number.clone(), entry))
    }

    async fn mark_bank_matched(
        &self,
        invoice_number: &str,
        bank_date: NaiveDate,
        bank_amount: f64,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.ledger.get_mut(invoice_number) {
            Some(entry) => {
                entry.source = entry.source.merge_bank();
                entry.bank_date = Some(bank_date);
                entry.bank_amount = Some(bank_amount);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn upsert_uploaded(&self, row: UploadedRow) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.uploaded.insert(row.invoice_number.clone(), row);
        Ok(())
    }

    async fn uploaded(&self) -> Result<Vec<UploadedRow>, StoreError> {
        let mut rows: Vec<UploadedRow> =
            self.inner.read().await.uploaded.values().cloned().collect();
        rows.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Source;

    fn entry(invoice: &str, amount: f64) -> LedgerEntry {
        LedgerEntry {
            invoice_number: invoice.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            amount,
            description: "desc".to_string(),
            category: "Business Expense".to_string(),
            vendor: "Shell".to_string(),
            source: Source::Email,
            pdf_path: None,
            bank_date: None,
            bank_amount: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_key() {
        let store = MemoryStore::new();
        store.insert_entry(entry("INV-001", 45.0)).await.unwrap();
        let err = store.insert_entry(entry("INV-001", 99.0)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_upsert_returns_replaced_entry() {
        let store = MemoryStore::new();
        assert!(store.upsert_entry(entry("INV-001", 45.0)).await.unwrap().is_none());
        let previous = store.upsert_entry(entry("INV-001", 50.0)).await.unwrap();
        assert_eq!(previous.unwrap().amount, 45.0);
        assert_eq!(store.ledger().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_bank_matched_records_evidence() {
        let store = MemoryStore::new();
        store.insert_entry(entry("INV-001", 45.0)).await.unwrap();
        let bank_date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let updated = store.mark_bank_matched("INV-001", bank_date, 45.2).await.unwrap();
        assert_eq!(updated, 1);

        let ledger = store.ledger().await.unwrap();
        assert_eq!(ledger[0].source, Source::Combined);
        assert_eq!(ledger[0].bank_amount, Some(45.2));
        assert_eq!(ledger[0].bank_date, Some(bank_date));
        // email-derived fields untouched
        assert_eq!(ledger[0].amount, 45.0);

        assert_eq!(store.mark_bank_matched("INV-404", bank_date, 1.0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_uploaded_overwrites() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        for amount in [45.0, 46.0] {
            store
                .upsert_uploaded(UploadedRow {
                    invoice_number: "INV-001".to_string(),
                    date,
                    amount,
                })
                .await
                .unwrap();
        }
        let rows = store.uploaded().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 46.0);
    }
}
