//! Normalized bank-statement rows produced by CSV ingestion.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::{MatchKey, Source};

/// Normalized output of the bank-statement ingestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankStatementRow {
    pub invoice_number: String,
    pub date: NaiveDate,
    /// Two-decimal precision, enforced at ingest.
    pub amount: f64,
}

impl BankStatementRow {
    pub fn match_key(&self) -> MatchKey {
        MatchKey::new(&self.invoice_number, self.amount)
    }

    /// Every ingested row carries bank-statement provenance.
    pub fn source(&self) -> Source {
        Source::BankStatement
    }
}

/// Round to two decimal places, clearing floating-point noise.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_cents() {
        assert_eq!(round_to_cents(10.999), 11.0);
        assert_eq!(round_to_cents(1234.5), 1234.5);
        assert_eq!(round_to_cents(-2.556), -2.56);
    }
}
