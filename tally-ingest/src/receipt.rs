//! Receipt-amount heuristics over extracted PDF text.
//!
//! The primary scan keeps the largest `$` figure: on a receipt the grand
//! total is normally the largest dollar amount on the page, larger than
//! any line-item subtotal. The aggressive fallback widens the net when the
//! primary scan finds nothing.

use anyhow::Result;
use regex::Regex;

/// Upper bound on fallback candidates. Filters out page numbers, phone
/// fragments, and dates that a bare-number pattern would otherwise catch.
const FALLBACK_CEILING: f64 = 10_000.0;

/// Largest `$`-prefixed amount in the text, if any.
pub fn largest_dollar_amount(text: &str) -> Result<Option<f64>> {
    let re = Regex::new(r"\$\s*(\d+(?:,\d{3})*(?:\.\d{2})?)")?;
    let mut best: Option<f64> = None;
    for caps in re.captures_iter(text) {
        let raw = caps[1].replace(',', "");
        if let Ok(value) = raw.parse::<f64>() {
            if value > 0.0 && best.is_none_or(|b| value > b) {
                best = Some(value);
            }
        }
    }
    Ok(best)
}

/// Fallback scan for text without `$` figures.
///
/// Keyword-adjacent figures (total/amount/due/balance/payment, or
/// invoice/charge/fee totals) are consulted first; bare numbers only when
/// no keyword-adjacent match exists. Candidates outside (0, 10,000) are
/// discarded.
pub fn aggressive_amount(text: &str) -> Result<Option<f64>> {
    let keyword_patterns = [
        r"\$\s*(\d+(?:,\d{3})*\.?\d*)",
        r"(?i)(\d+(?:,\d{3})*\.?\d*)\s*(?:dollars|USD)",
        r"(?i)(?:total|amount|due|balance|payment)(?:\s*(?:due|is|of|:))?\s*\$?\s*(\d+(?:,\d{3})*\.?\d*)",
        r"(?i)(?:invoice|charge|fee)\s+(?:total|amount|sum)(?:\s*(?:due|is|of|:))?\s*\$?\s*(\d+(?:,\d{3})*\.?\d*)",
    ];

    let mut candidates = Vec::new();
    for pattern in keyword_patterns {
        let re = Regex::new(pattern)?;
        collect_bounded(&re, text, &mut candidates);
    }
    if candidates.is_empty() {
        let re = Regex::new(r"(\d+(?:,\d{3})*\.?\d*)")?;
        collect_bounded(&re, text, &mut candidates);
    }

    Ok(candidates.into_iter().reduce(f64::max))
}

fn collect_bounded(re: &Regex, text: &str, out: &mut Vec<f64>) {
    for caps in re.captures_iter(text) {
        let raw = caps[1].replace(',', "");
        if let Ok(value) = raw.parse::<f64>() {
            if value > 0.0 && value < FALLBACK_CEILING {
                out.push(value);
            }
        }
    }
}
