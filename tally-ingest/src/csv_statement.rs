//! Bank-statement CSV ingestion.
//!
//! Expected header (extra columns are ignored):
//!   Invoice Number,Date,Amount
//!   INV-001,2024-02-01,$45.00

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use tally_core::{BankStatementRow, round_to_cents};

use crate::error::IngestError;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y"];
const AMOUNT_LIMIT: f64 = 1_000_000.0;

/// Parse uploaded CSV text into normalized statement rows.
///
/// Fails fast: the first invalid row aborts the ingest with its 1-based
/// row number and the offending value.
pub fn ingest_csv(text: &str) -> Result<Vec<BankStatementRow>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let records = rdr
        .records()
        .collect::<Result<Vec<csv::StringRecord>, _>>()?;
    if records.is_empty() {
        return Err(IngestError::EmptyFile);
    }

    let col = |name: &str| headers.iter().position(|h| h == name);
    let (invoice_col, date_col, amount_col) = (col("Invoice Number"), col("Date"), col("Amount"));

    let missing: Vec<String> = [
        ("Invoice Number", invoice_col),
        ("Date", date_col),
        ("Amount", amount_col),
    ]
    .iter()
    .filter(|(_, idx)| idx.is_none())
    .map(|(name, _)| name.to_string())
    .collect();
    let (Some(invoice_col), Some(date_col), Some(amount_col)) = (invoice_col, date_col, amount_col)
    else {
        return Err(IngestError::MissingColumns(missing));
    };

    let amount_re = Regex::new(r"^-?\d*\.?\d+$")?;

    let mut rows = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let fail = |reason: String| IngestError::Row { row, reason };

        let invoice_number = record.get(invoice_col).unwrap_or("").trim();
        if invoice_number.is_empty() {
            return Err(fail("Invoice Number is required".to_string()));
        }

        let date_raw = record.get(date_col).unwrap_or("").trim();
        if date_raw.is_empty() {
            return Err(fail("Date is required".to_string()));
        }
        let date = parse_statement_date(date_raw).ok_or_else(|| {
            fail(format!(
                "invalid date \"{date_raw}\": expected YYYY-MM-DD, M/D/YYYY, or M-D-YYYY"
            ))
        })?;
        let max_year = Utc::now().year() + 5;
        if date.year() < 1900 || date.year() > max_year {
            return Err(fail(format!(
                "date year must be between 1900 and {max_year}, got {}",
                date.year()
            )));
        }

        let amount_raw = record.get(amount_col).unwrap_or("").trim();
        if amount_raw.is_empty() {
            return Err(fail("Amount is required".to_string()));
        }
        let amount = parse_statement_amount(amount_raw, &amount_re).map_err(fail)?;

        rows.push(BankStatementRow {
            invoice_number: invoice_number.to_string(),
            date,
            amount,
        });
    }

    Ok(rows)
}

fn parse_statement_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Strip currency symbols/commas/whitespace and parse, enforcing a plain
/// decimal shape and the plausible-amount range.
fn parse_statement_amount(raw: &str, amount_re: &Regex) -> Result<f64, String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if !amount_re.is_match(&cleaned) {
        return Err(format!("invalid amount \"{raw}\": expected a number"));
    }
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| format!("invalid amount \"{raw}\": expected a number"))?;
    if !amount.is_finite() {
        return Err(format!("invalid amount \"{raw}\": not a finite number"));
    }
    if !(-AMOUNT_LIMIT..=AMOUNT_LIMIT).contains(&amount) {
        return Err(format!(
            "amount \"{raw}\" must be between -$1,000,000 and $1,000,000"
        ));
    }
    Ok(round_to_cents(amount))
}
