//! Ledger entry types, keyed by invoice number.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::statement::BankStatementRow;

/// Provenance of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Source {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "bank statement")]
    BankStatement,
    #[serde(rename = "email, bank statement")]
    Combined,
}

impl Source {
    /// Tag after a bank-statement match. Combined requires email evidence,
    /// so a bank-only entry stays bank-only; re-merging is a no-op.
    pub fn merge_bank(self) -> Source {
        match self {
            Source::Email | Source::Combined => Source::Combined,
            Source::BankStatement => Source::BankStatement,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::Email => "email",
            Source::BankStatement => "bank statement",
            Source::Combined => "email, bank statement",
        };
        write!(f, "{s}")
    }
}

/// Key deciding whether two records describe the same transaction:
/// identical invoice numbers AND amounts that agree after rounding to the
/// nearest whole currency unit. The rounding tolerance absorbs extraction
/// noise between a parsed PDF total and a bank-reported total.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub invoice_number: String,
    pub rounded_amount: i64,
}

impl MatchKey {
    pub fn new(invoice_number: impl Into<String>, amount: f64) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            rounded_amount: amount.round() as i64,
        }
    }
}

/// One reconciled transaction record. At most one entry per invoice number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub vendor: String,
    pub source: Source,
    pub pdf_path: Option<String>,
    /// Raw figures from a matched bank row, kept alongside the
    /// email-derived fields rather than overwriting them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_amount: Option<f64>,
}

impl LedgerEntry {
    pub fn match_key(&self) -> MatchKey {
        MatchKey::new(&self.invoice_number, self.amount)
    }

    /// Entry for a bank row with no email counterpart.
    pub fn from_bank_row(row: &BankStatementRow) -> Self {
        Self {
            invoice_number: row.invoice_number.clone(),
            date: row.date,
            amount: row.amount,
            description: format!("Bank statement entry - {}", row.invoice_number),
            category: "Bank Statement".to_string(),
            vendor: "Unknown".to_string(),
            source: row.source(),
            pdf_path: None,
            bank_date: None,
            bank_amount: None,
        }
    }
}

/// Auxiliary record remembering a bank row that has already been ingested.
/// Upserted by invoice number, so re-ingesting the same CSV overwrites
/// instead of duplicating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedRow {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub amount: f64,
}

impl From<&BankStatementRow> for UploadedRow {
    fn from(row: &BankStatementRow) -> Self {
        Self {
            invoice_number: row.invoice_number.clone(),
            date: row.date,
            amount: row.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_match_key_rounds_to_whole_units() {
        assert_eq!(MatchKey::new("INV-001", 45.0), MatchKey::new("INV-001", 45.49));
        assert_eq!(MatchKey::new("INV-001", 45.0), MatchKey::new("INV-001", 44.50));
        assert_ne!(MatchKey::new("INV-001", 45.0), MatchKey::new("INV-001", 46.2));
        assert_ne!(MatchKey::new("INV-001", 45.0), MatchKey::new("INV-002", 45.0));
    }

    #[test]
    fn test_merge_bank_is_idempotent() {
        assert_eq!(Source::Email.merge_bank(), Source::Combined);
        assert_eq!(Source::Combined.merge_bank(), Source::Combined);
        assert_eq!(Source::BankStatement.merge_bank(), Source::BankStatement);
    }

    #[test]
    fn test_source_serializes_as_display_tags() {
        assert_eq!(serde_json::to_string(&Source::Email).unwrap(), "\"email\"");
        assert_eq!(
            serde_json::to_string(&Source::Combined).unwrap(),
            "\"email, bank statement\""
        );
        assert_eq!(Source::BankStatement.to_string(), "bank statement");
    }

    #[test]
    fn test_entry_from_bank_row() {
        let row = BankStatementRow {
            invoice_number: "INV-042".to_string(),
            date: date("2024-03-01"),
            amount: 19.99,
        };
        let entry = LedgerEntry::from_bank_row(&row);
        assert_eq!(entry.invoice_number, "INV-042");
        assert_eq!(entry.vendor, "Unknown");
        assert_eq!(entry.source, Source::BankStatement);
        assert!(entry.description.contains("INV-042"));
        assert_eq!(entry.category, "Bank Statement");
    }
}
