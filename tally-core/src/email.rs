//! Source email records and vendor derivation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An ingested email with (possibly) a PDF receipt attached. Produced by
/// the external mail/generator side; the pipeline only reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailRecord {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub received_at: NaiveDate,
    pub has_attachment: bool,
    pub invoice_number: Option<String>,
    /// Publicly fetchable location of the attachment, when hosted.
    pub pdf_url: Option<String>,
    /// Blob-store path of the attachment, when stored locally.
    pub pdf_path: Option<String>,
}

impl EmailRecord {
    /// Display vendor derived from the sender address.
    pub fn vendor(&self) -> String {
        vendor_from_sender(&self.sender)
    }
}

/// Derive a vendor name from an email sender:
/// `receipts@shell.com` -> `Shell` (domain with the TLD stripped, first
/// letter capitalized).
pub fn vendor_from_sender(sender: &str) -> String {
    let domain = sender.rsplit('@').next().unwrap_or(sender);
    let stem = domain.split('.').next().unwrap_or(domain);
    capitalize(stem)
}

/// Derive a vendor name from a receipt filename:
/// `invoice_amazon_123.pdf` -> `Amazon`. Generic document words and
/// numeric segments are skipped; `Unknown` when nothing qualifies.
pub fn vendor_from_filename(filename: &str) -> String {
    let stem = filename
        .strip_suffix(".pdf")
        .or_else(|| filename.strip_suffix(".PDF"))
        .unwrap_or(filename);

    for part in stem.split(['_', '-']) {
        let lower = part.to_lowercase();
        if part.len() > 2
            && !part.chars().all(|c| c.is_ascii_digit())
            && !matches!(lower.as_str(), "invoice" | "receipt" | "order" | "scan")
        {
            return capitalize(&lower);
        }
    }
    "Unknown".to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Unknown".to_string(),
    }
}
