// Parsing and formatting helpers.
//
// Everything that has to cope with "dirty" spreadsheet cells lives here so
// the ETL can work with typed values. Parsers never fail loudly: a value
// that cannot be read comes back as `None` and the caller decides whether
// that is a dropped row or a null field.
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

// "260.000", "1.234.567,89": dots group thousands, the comma is the decimal point.
static PT_BR_GROUPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{3})+(,\d+)?$").unwrap());

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Parse a numeric cell.
///
/// - Trims whitespace and rejects blanks.
/// - Rejects values containing letters (`"nan"`, `"sem info"`, ...).
/// - Accepts `,` as the decimal separator when there is no `.`.
/// - Reads pt-BR thousands grouping (`"260.000"`, `"1.234,5"`). A single
///   dot followed by exactly three digits is taken as grouping, so
///   `"1.500"` is 1500.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let parsed = if PT_BR_GROUPED.is_match(s) {
        s.replace('.', "").replace(',', ".").parse::<f64>().ok()
    } else if s.contains(',') && !s.contains('.') {
        s.replace(',', ".").parse::<f64>().ok()
    } else {
        s.parse::<f64>().ok()
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse a date cell in any of the layouts the spreadsheet exports produce.
/// Timestamps are truncated to their date.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// A blank cell, or the literal `nan` a spreadsheet round trip leaves
/// behind, counts as missing text.
pub fn is_missing_text(s: Option<&str>) -> bool {
    match s.map(str::trim) {
        None => true,
        Some(t) => t.is_empty() || t.eq_ignore_ascii_case("nan"),
    }
}

pub fn month_name(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

/// Calendar position (0-based) of an English month name.
pub fn month_index(name: &str) -> Option<usize> {
    MONTH_NAMES.iter().position(|m| *m == name)
}

/// English weekday name, as `%A` prints it.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators
    // (e.g. `1,234,567.89`).
    if !n.is_finite() {
        return "-".to_string();
    }
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Percentage with an arrow, as the dashboard shows period-over-period
/// change. `None` renders as `-`.
pub fn format_change(change: Option<f64>) -> String {
    match change {
        None => "-".to_string(),
        Some(v) if v > 0.0 => format!("▲ {:.2}%", v.abs()),
        Some(v) if v < 0.0 => format!("▼ {:.2}%", v.abs()),
        Some(v) => format!("{:.2}%", v.abs()),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
