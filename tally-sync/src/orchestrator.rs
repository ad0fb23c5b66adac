//! Sync orchestrator: turns pending source emails into ledger entries.

use std::collections::HashSet;

use rand::Rng;
use tally_core::{EmailRecord, LedgerEntry, Source};
use tracing::{info, warn};

use crate::batch::batch_extract;
use crate::error::StoreError;
use crate::extract::{AmountExtractor, DocumentLocation, ExtractionResult};
use crate::store::Store;

const DEFAULT_CONCURRENCY: usize = 8;

/// What to do when extraction yields no positive amount.
///
/// `Placeholder` fabricates a figure so the ledger stays complete at the
/// cost of injecting made-up data; such entries are logged at `warn` as
/// needing manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Random whole amount in 75..=125, flagged for manual review.
    #[default]
    Placeholder,
    /// Leave the record unprocessed this run.
    Skip,
    /// Write the entry with a zero amount for manual correction.
    FlagForReview,
}

/// Per-record outcome of a sync run.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub email_id: String,
    pub invoice_number: String,
    /// Amount written to the ledger; `None` when the record was skipped
    /// or failed.
    pub amount: Option<f64>,
    pub needs_review: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Records that produced a ledger entry.
    pub processed: usize,
    /// Records that were pending at the start of the run.
    pub total: usize,
    pub results: Vec<ItemOutcome>,
}

struct PendingEmail {
    email: EmailRecord,
    invoice_number: String,
    location: DocumentLocation,
}

/// Drives extraction end-to-end against the store: pulls pending emails,
/// extracts their receipt amounts, and writes ledger entries keyed by
/// invoice number.
pub struct SyncOrchestrator<S, E> {
    store: S,
    extractor: E,
    policy: FailurePolicy,
    max_concurrency: usize,
}

impl<S: Store, E: AmountExtractor> SyncOrchestrator<S, E> {
    pub fn new(store: S, extractor: E) -> Self {
        Self {
            store,
            extractor,
            policy: FailurePolicy::default(),
            max_concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process every pending email into a ledger entry.
    ///
    /// Pending means: has an attachment, an invoice number, a resolvable
    /// PDF location, and no ledger entry under its invoice number yet. A
    /// failure on one record is recorded in its outcome and processing
    /// continues.
    pub async fn sync_pending(&self) -> Result<SyncReport, StoreError> {
        let ledger_keys: HashSet<String> = self
            .store
            .ledger()
            .await?
            .into_iter()
            .map(|entry| entry.invoice_number)
            .collect();

        let pending: Vec<PendingEmail> = self
            .store
            .emails()
            .await?
            .into_iter()
            .filter(|email| email.has_attachment)
            .filter_map(|email| {
                let invoice_number = email.invoice_number.clone()?;
                if ledger_keys.contains(&invoice_number) {
                    return None;
                }
                let location = document_location(&email)?;
                Some(PendingEmail {
                    email,
                    invoice_number,
                    location,
                })
            })
            .collect();

        if pending.is_empty() {
            info!("ledger in sync, no pending emails");
            return Ok(SyncReport::default());
        }
        info!(pending = pending.len(), "syncing pending emails");

        let locations: Vec<DocumentLocation> =
            pending.iter().map(|p| p.location.clone()).collect();
        let extractions =
            batch_extract(&self.extractor, &locations, self.max_concurrency).await;

        let mut report = SyncReport {
            total: pending.len(),
            ..SyncReport::default()
        };
        for (item, extraction) in pending.into_iter().zip(extractions) {
            let outcome = self.record_entry(item, extraction).await;
            if outcome.amount.is_some() && outcome.error.is_none() {
                report.processed += 1;
            }
            report.results.push(outcome);
        }

        info!(
            processed = report.processed,
            total = report.total,
            "ledger sync complete"
        );
        Ok(report)
    }

    async fn record_entry(
        &self,
        item: PendingEmail,
        extraction: ExtractionResult,
    ) -> ItemOutcome {
        let PendingEmail {
            email,
            invoice_number,
            location,
        } = item;
        let mut outcome = ItemOutcome {
            email_id: email.id.clone(),
            invoice_number: invoice_number.clone(),
            amount: None,
            needs_review: false,
            error: None,
        };

        let amount = if extraction.success && extraction.amount > 0.0 {
            extraction.amount
        } else {
            match self.policy {
                FailurePolicy::Placeholder => {
                    let placeholder = rand::thread_rng().gen_range(75..=125) as f64;
                    warn!(
                        invoice = %invoice_number,
                        amount = placeholder,
                        "no amount extracted, placeholder entry needs manual review"
                    );
                    outcome.needs_review = true;
                    placeholder
                }
                FailurePolicy::Skip => {
                    warn!(invoice = %invoice_number, "no amount extracted, skipping record");
                    outcome.error = extraction.error;
                    return outcome;
                }
                FailurePolicy::FlagForReview => {
                    warn!(
                        invoice = %invoice_number,
                        "no amount extracted, zero-amount entry needs manual review"
                    );
                    outcome.needs_review = true;
                    0.0
                }
            }
        };

        let entry = LedgerEntry {
            invoice_number: invoice_number.clone(),
            date: email.received_at,
            amount,
            description: email.subject.clone(),
            category: "Business Expense".to_string(),
            vendor: email.vendor(),
            source: Source::Email,
            pdf_path: Some(location.file_name()),
            bank_date: None,
            bank_amount: None,
        };

        match self.store.upsert_entry(entry).await {
            Ok(replaced) => {
                if let Some(previous) = replaced {
                    warn!(
                        invoice = %invoice_number,
                        previous_amount = previous.amount,
                        "replaced existing ledger entry, last writer wins"
                    );
                }
                outcome.amount = Some(amount);
            }
            Err(e) => outcome.error = Some(e.to_string()),
        }
        outcome
    }
}

fn document_location(email: &EmailRecord) -> Option<DocumentLocation> {
    if let Some(url) = &email.pdf_url {
        return Some(DocumentLocation::Url(url.clone()));
    }
    email
        .pdf_path
        .as_ref()
        .map(|path| DocumentLocation::StoragePath(path.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_document_location_prefers_url() {
        let email = EmailRecord {
            id: "e1".to_string(),
            sender: "receipts@shell.com".to_string(),
            subject: "Your Shell fuel receipt".to_string(),
            received_at: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            has_attachment: true,
            invoice_number: Some("INV-001".to_string()),
            pdf_url: Some("https://cdn.example.com/inv-001.pdf".to_string()),
            pdf_path: Some("invoices/inv-001.pdf".to_string()),
        };
        assert_eq!(
            document_location(&email),
            Some(DocumentLocation::Url(
                "https://cdn.example.com/inv-001.pdf".to_string()
            ))
        );

        let stored = EmailRecord {
            pdf_url: None,
            ..email.clone()
        };
        assert_eq!(
            document_location(&stored),
            Some(DocumentLocation::StoragePath(
                "invoices/inv-001.pdf".to_string()
            ))
        );

        let bare = EmailRecord {
            pdf_url: None,
            pdf_path: None,
            ..email
        };
        assert_eq!(document_location(&bare), None);
    }
}
