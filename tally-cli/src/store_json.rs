//! File-backed store implementations under `~/.tally/`.
//!
//! Each table is one JSON array (`emails.json`, `ledger.json`,
//! `uploaded.json`); blobs are plain files in a directory. Small corpora
//! only, which is all this demo tool handles.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use tally_core::{EmailRecord, LedgerEntry, UploadedRow};
use tally_sync::{BlobStore, Store, StoreError};
use tokio::sync::Mutex;

const EMAILS: &str = "emails.json";
const LEDGER: &str = "ledger.json";
const UPLOADED: &str = "uploaded.json";

pub struct JsonStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on the table files.
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_table<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| StoreError::Backend(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Backend(format!("parse {}: {e}", path.display())))
    }

    fn write_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Backend(format!("create {}: {e}", self.dir.display())))?;
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(rows)
            .map_err(|e| StoreError::Backend(format!("serialize {name}: {e}")))?;
        std::fs::write(&path, json)
            .map_err(|e| StoreError::Backend(format!("write {}: {e}", path.display())))
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn emails(&self) -> Result<Vec<EmailRecord>, StoreError> {
        self.read_table(EMAILS)
    }

    async fn ledger(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        self.read_table(LEDGER)
    }

    async fn insert_entry(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries: Vec<LedgerEntry> = self.read_table(LEDGER)?;
        if entries.iter().any(|e| e.invoice_number == entry.invoice_number) {
            return Err(StoreError::DuplicateKey {
                invoice_number: entry.invoice_number,
            });
        }
        entries.push(entry);
        self.write_table(LEDGER, &entries)
    }

    async fn upsert_entry(
        &self,
        entry: LedgerEntry,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries: Vec<LedgerEntry> = self.read_table(LEDGER)?;
        let previous = match entries
            .iter()
            .position(|e| e.invoice_number == entry.invoice_number)
        {
            Some(i) => Some(std::mem::replace(&mut entries[i], entry)),
            None => {
                entries.push(entry);
                None
            }
        };
        self.write_table(LEDGER, &entries)?;
        Ok(previous)
    }

    async fn mark_bank_matched(
        &self,
        invoice_number: &str,
        bank_date: NaiveDate,
        bank_amount: f64,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries: Vec<LedgerEntry> = self.read_table(LEDGER)?;
        let mut updated = 0;
        for entry in entries.iter_mut().filter(|e| e.invoice_number == invoice_number) {
            entry.source = entry.source.merge_bank();
            entry.bank_date = Some(bank_date);
            entry.bank_amount = Some(bank_amount);
            updated += 1;
        }
        if updated > 0 {
            self.write_table(LEDGER, &entries)?;
        }
        Ok(updated)
    }

    async fn upsert_uploaded(&self, row: UploadedRow) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<UploadedRow> = self.read_table(UPLOADED)?;
        match rows
            .iter()
            .position(|r| r.invoice_number == row.invoice_number)
        {
            Some(i) => rows[i] = row,
            None => rows.push(row),
        }
        self.write_table(UPLOADED, &rows)
    }

    async fn uploaded(&self) -> Result<Vec<UploadedRow>, StoreError> {
        self.read_table(UPLOADED)
    }
}

/// Serves blobs from a local directory, flat namespace.
pub struct DirBlob {
    root: PathBuf,
}

impl DirBlob {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for DirBlob {
    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::BlobNotFound {
                    path: path.to_string(),
                }
            } else {
                StoreError::Backend(format!("read {}: {e}", full.display()))
            }
        })
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StoreError> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("create {}: {e}", parent.display())))?;
        }
        std::fs::write(&full, bytes)
            .map_err(|e| StoreError::Backend(format!("write {}: {e}", full.display())))?;
        Ok(path.to_string())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Backend(format!(
                    "read {}: {e}",
                    self.root.display()
                )));
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| StoreError::Backend(format!("read dir entry: {e}")))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_file() && name.starts_with(prefix) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn public_url(&self, path: &str) -> String {
        format!("file://{}", self.root.join(path).display())
    }
}
