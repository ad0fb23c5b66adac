//! tally-ingest: bank-statement CSV ingestion and receipt-amount scanning
//! over extracted PDF text.

pub mod csv_statement;
pub mod error;
pub mod pdf_text;
pub mod receipt;

pub use csv_statement::ingest_csv;
pub use error::IngestError;
pub use pdf_text::{PdfTextError, extract_text};
pub use receipt::{aggressive_amount, largest_dollar_amount};
