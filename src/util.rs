// Utility helpers for parsing, ratios and display formatting.
//
// Raw spreadsheet cells are only ever interpreted here; everything past the
// loader works with typed values.
use crate::types::CRORE;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Cell values the spreadsheet export uses for "no value".
const MISSING_MARKERS: [&str; 9] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

// Two-digit years go first: `%Y` would happily read `25` as year 0025.
const DATE_FORMATS: [&str; 6] = ["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];

const DATETIME_FORMATS: [&str; 5] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// True when the raw cell carries no value. Whitespace-only text is *not*
/// blank here; callers that care trim first.
pub fn is_missing(s: Option<&str>) -> bool {
    match s {
        None => true,
        Some(v) => MISSING_MARKERS.contains(&v),
    }
}

/// Lenient numeric cell parse: surrounding whitespace and `,` group
/// separators are ignored. Text, NaN and infinities give `None`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Stage amounts must be non-negative; anything else is unusable.
pub fn parse_amount(s: Option<&str>) -> Option<f64> {
    parse_f64_safe(s).filter(|v| *v >= 0.0)
}

/// Parse a currency cell such as `₹12,34,567 Cr`, `Rs. 1,200` or `-4500`
/// into a plain number. Currency symbols and the `Cr` suffix are decoration
/// only; the digits are taken as-is.
pub fn parse_currency(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let mut cleaned = s.replace('₹', "");
    for token in ["INR", "Rs.", "Rs", "Cr.", "Cr", "cr"] {
        cleaned = cleaned.replace(token, "");
    }
    let cleaned: String = cleaned.chars().filter(|c| !c.is_whitespace()).collect();
    parse_f64_safe(Some(&cleaned))
}

/// Parse a month cell using the day-first convention and truncate it to the
/// first day of its month.
pub fn parse_month_dayfirst(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let date = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            // Month-only labels like `Oct 2025` / `October 2025`.
            let padded = format!("01 {}", s);
            ["%d %b %Y", "%d %B %Y"]
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(&padded, f).ok())
        })?;
    date.with_day(1)
}

/// Parse an ISO `YYYY-MM-DD` date (used for configuration values).
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// `numerator / denominator * 100`, defined as 0 when the denominator is 0.
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let v = numerator / denominator * 100.0;
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Plain ratio with the same zero-denominator guard as [`percent`].
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    percent(numerator, denominator) / 100.0
}

pub fn to_crore(raw: f64) -> f64 {
    raw / CRORE
}

pub fn average(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Pipeline figures: `₹<value> Cr` with one decimal and no digit grouping.
pub fn fmt_cr(raw: f64) -> String {
    // `+ 0.0` turns -0.0 into 0.0.
    format!("₹{:.1} Cr", to_crore(raw) + 0.0)
}

/// Revenue-summary figures: `₹<value> Cr` with two decimals, ungrouped.
pub fn fmt_cr2(raw: f64) -> String {
    format!("₹{:.2} Cr", to_crore(raw) + 0.0)
}

/// Fixed decimals with `en` thousands grouping, e.g. `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let grouped = int_part.parse::<u64>().unwrap_or(0).to_formatted_string(&Locale::en);
    // A value that rounds to zero never carries a sign.
    let sign = if n < 0.0 && fixed.bytes().any(|b| (b'1'..=b'9').contains(&b)) { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Row and deal counts in console messages.
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_cr_uses_fixed_crore_scale() {
        assert_eq!(fmt_cr(0.0), "₹0.0 Cr");
        assert_eq!(fmt_cr(100_000_000.0), "₹10.0 Cr");
        assert_eq!(fmt_cr(125_000_000_000.0), "₹12500.0 Cr");
        assert_eq!(fmt_cr2(125_000_000_000.0), "₹12500.00 Cr");
        assert_eq!(fmt_cr(-0.0), "₹0.0 Cr");
        assert_eq!(fmt_cr2(12_345_678.0), "₹1.23 Cr");
    }

    #[test]
    fn format_number_drops_sign_of_rounded_zero() {
        assert_eq!(format_number(-0.0001, 1), "0.0");
        assert_eq!(format_number(-1234.5, 1), "-1,234.5");
    }

    #[test]
    fn amounts_reject_text_and_negatives() {
        assert_eq!(parse_amount(Some(" 1,500 ")), Some(1500.0));
        assert_eq!(parse_amount(Some("abc")), None);
        assert_eq!(parse_amount(Some("-5")), None);
        assert_eq!(parse_amount(Some("")), None);
        assert_eq!(parse_amount(Some("inf")), None);
    }

    #[test]
    fn currency_strings_parse_to_plain_numbers() {
        assert_eq!(parse_currency(Some("₹12,34,567 Cr")), Some(1_234_567.0));
        assert_eq!(parse_currency(Some("Rs. 1,200")), Some(1200.0));
        assert_eq!(parse_currency(Some("-₹4,500")), Some(-4500.0));
        assert_eq!(parse_currency(Some("42.5")), Some(42.5));
        assert_eq!(parse_currency(Some("pending")), None);
        assert_eq!(parse_currency(None), None);
    }

    #[test]
    fn months_parse_day_first() {
        let oct = NaiveDate::from_ymd_opt(2025, 10, 1);
        assert_eq!(parse_month_dayfirst(Some("15/10/2025")), oct);
        assert_eq!(parse_month_dayfirst(Some("01-10-2025")), oct);
        assert_eq!(parse_month_dayfirst(Some("2025-10-20")), oct);
        assert_eq!(parse_month_dayfirst(Some("03/10/2025 14:30:00")), oct);
        assert_eq!(parse_month_dayfirst(Some("Oct 2025")), oct);
        // 02/11 is the 2nd of November, not February 11th.
        assert_eq!(
            parse_month_dayfirst(Some("02/11/2025")),
            NaiveDate::from_ymd_opt(2025, 11, 1)
        );
        assert_eq!(parse_month_dayfirst(Some("not a date")), None);
        assert_eq!(parse_month_dayfirst(Some("31/02/2025")), None);
    }

    #[test]
    fn percent_is_zero_for_zero_denominator() {
        assert_eq!(percent(5.0, 0.0), 0.0);
        assert_eq!(percent(1.0, 4.0), 25.0);
        assert_eq!(ratio(1.0, 4.0), 0.25);
    }

    #[test]
    fn missing_markers_are_blank() {
        assert!(is_missing(None));
        assert!(is_missing(Some("")));
        assert!(is_missing(Some("NaN")));
        assert!(!is_missing(Some(" ")));
        assert!(!is_missing(Some("Lost")));
    }
}
