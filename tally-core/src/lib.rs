//! tally-core: domain types and reconciliation logic for the expense ledger.

pub mod email;
pub mod ledger;
pub mod reconcile;
pub mod statement;

pub use email::{EmailRecord, vendor_from_filename, vendor_from_sender};
pub use ledger::{LedgerEntry, MatchKey, Source, UploadedRow};
pub use reconcile::{BankMatch, ReconcileOutcome, reconcile};
pub use statement::{BankStatementRow, round_to_cents};
