// Utility helpers for parsing, calendar math and number formatting.
//
// CSV exports from the state board are messy (thousands separators, blank
// cells, "NA"), so everything that touches raw text lives here and the rest
// of the crate works with typed values.
use chrono::{Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64`, forgiving of CSV formatting noise.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters ("NA", "n/a").
/// - Strips thousands separators and a trailing `%`.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.trim_end_matches('%').parse::<f64>().ok()
}

pub fn parse_u64_safe(s: Option<&str>) -> Option<u64> {
    // Population counts sometimes arrive as "12,345.0".
    let v = parse_f64_safe(s)?;
    if v < 0.0 || !v.is_finite() {
        return None;
    }
    Some(v.trunc() as u64)
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

pub fn parse_bool_safe(s: Option<&str>) -> Option<bool> {
    match s?.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Number of days in the calendar month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        // Only reachable at the edge of chrono's supported range.
        _ => 31,
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

/// Signed percent change from `old` to `new`; negative means usage fell.
///
/// Returns `None` when `old` is zero.
pub fn percentage_change(old: f64, new: f64) -> Option<f64> {
    if old == 0.0 {
        return None;
    }
    Some(((new - old) / old) * 100.0)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus `1,234,567.89` style grouping.
    let s = format!("{:.*}", decimals, n.abs());
    // No sign when the value rounds to zero.
    let neg = n.is_sign_negative() && s.chars().any(|c| c.is_ascii_digit() && c != '0');
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

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_noisy_numbers() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("NA")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
        assert_eq!(parse_u64_safe(Some("12,345.0")), Some(12345));
        assert_eq!(parse_u64_safe(Some("-3")), None);
    }

    #[test]
    fn parses_both_date_layouts() {
        let d = NaiveDate::from_ymd_opt(2015, 7, 1).unwrap();
        assert_eq!(parse_date_safe(Some("2015-07-01")), Some(d));
        assert_eq!(parse_date_safe(Some("07/01/2015")), Some(d));
        assert_eq!(parse_date_safe(Some("July 2015")), None);
    }

    #[test]
    fn counts_days_including_leap_february() {
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2016, 2, 1).unwrap()), 29);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2015, 2, 1).unwrap()), 28);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2015, 12, 1).unwrap()), 31);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()), 30);
    }

    #[test]
    fn percentage_change_is_signed() {
        assert_eq!(percentage_change(1000.0, 750.0), Some(-25.0));
        assert_eq!(percentage_change(1000.0, 1100.0), Some(10.0));
        assert_eq!(percentage_change(0.0, 10.0), None);
    }

    #[test]
    fn formats_with_grouping() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-25.0, 1), "-25.0");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(-0.04, 1), "0.0");
        assert_eq!(format_number(-0.05, 0), "0");
        assert_eq!(format_number(-0.06, 1), "-0.1");
        assert_eq!(format_int(9855u64), "9,855");
    }
}
