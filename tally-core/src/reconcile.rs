//! Reconciliation matcher: the single source of truth for how bank rows
//! merge into the ledger.

use std::collections::HashMap;

use crate::ledger::{LedgerEntry, MatchKey};
use crate::statement::BankStatementRow;

/// A bank row that matched an existing ledger entry by key. The entry's
/// email-derived fields stay authoritative; the row is kept as
/// supplementary evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct BankMatch {
    pub row: BankStatementRow,
    pub entry: LedgerEntry,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub matched: Vec<BankMatch>,
    pub unmatched: Vec<BankStatementRow>,
}

/// Partition bank rows into matched/unmatched against the current ledger.
///
/// Row order is irrelevant to the outcome; the lookup is keyed by
/// [`MatchKey`]. Re-running against the same inputs yields the same
/// partition.
pub fn reconcile(ledger: &[LedgerEntry], bank_rows: &[BankStatementRow]) -> ReconcileOutcome {
    let by_key: HashMap<MatchKey, &LedgerEntry> =
        ledger.iter().map(|entry| (entry.match_key(), entry)).collect();

    let mut outcome = ReconcileOutcome::default();
    for row in bank_rows {
        match by_key.get(&row.match_key()) {
            Some(entry) => outcome.matched.push(BankMatch {
                row: row.clone(),
                entry: (*entry).clone(),
            }),
            None => outcome.unmatched.push(row.clone()),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Source;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entry(invoice: &str, amount: f64) -> LedgerEntry {
        LedgerEntry {
            invoice_number: invoice.to_string(),
            date: date("2024-01-15"),
            amount,
            description: "Shell Gas Station Receipt".to_string(),
            category: "Business Expense".to_string(),
            vendor: "Shell".to_string(),
            source: Source::Email,
            pdf_path: Some("inv.pdf".to_string()),
            bank_date: None,
            bank_amount: None,
        }
    }

    fn row(invoice: &str, amount: f64) -> BankStatementRow {
        BankStatementRow {
            invoice_number: invoice.to_string(),
            date: date("2024-02-01"),
            amount,
        }
    }

    #[test]
    fn test_matches_on_invoice_and_rounded_amount() {
        let ledger = vec![entry("INV-001", 45.0)];
        let outcome = reconcile(&ledger, &[row("INV-001", 45.20)]);
        assert_eq!(outcome.matched.len(), 1);
        assert!(outcome.unmatched.is_empty());
        assert_eq!(outcome.matched[0].entry.invoice_number, "INV-001");
    }

    #[test]
    fn test_amount_outside_rounding_tolerance_is_unmatched() {
        let ledger = vec![entry("INV-001", 45.0)];
        let outcome = reconcile(&ledger, &[row("INV-001", 46.80)]);
        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
    }

    #[test]
    fn test_unknown_invoice_is_unmatched() {
        let ledger = vec![entry("INV-001", 45.0)];
        let outcome = reconcile(&ledger, &[row("INV-999", 45.0)]);
        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
    }

    #[test]
    fn test_reconcile_is_repeatable() {
        let ledger = vec![entry("INV-001", 45.0), entry("INV-002", 12.5)];
        let rows = vec![row("INV-001", 45.0), row("INV-003", 9.99)];
        let first = reconcile(&ledger, &rows);
        let second = reconcile(&ledger, &rows);
        assert_eq!(first, second);
        assert_eq!(first.matched.len(), 1);
        assert_eq!(first.unmatched.len(), 1);
    }

    #[test]
    fn test_matched_entry_fields_stay_authoritative() {
        let ledger = vec![entry("INV-001", 45.0)];
        let outcome = reconcile(&ledger, &[row("INV-001", 45.0)]);
        let matched = &outcome.matched[0];
        // The merge policy records the row as evidence without rewriting
        // the email-derived entry.
        assert_eq!(matched.entry.description, "Shell Gas Station Receipt");
        assert_eq!(matched.entry.vendor, "Shell");
        assert_eq!(matched.entry.date, date("2024-01-15"));
        assert_eq!(matched.row.date, date("2024-02-01"));
    }
}
