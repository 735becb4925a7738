// Utility helpers for parsing cells, dates and numbers.
//
// Inspection exports mix Excel serial numbers, `YYYYMMDD` integers and
// hand-typed date strings in the same column, and percentages arrive either
// as fractions or as whole numbers. Everything messy about cell values is
// handled here so the normalizer can stay a straight column projection.
use crate::types::Cell;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use num_format::{Locale, ToFormattedString};

/// Days between 1899-12-30 (Excel's day zero) and 1970-01-01.
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25569.0;
const MS_PER_DAY: f64 = 86_400_000.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d"];

/// Convert an Excel 1900-epoch serial into a timestamp.
///
/// One extra day is subtracted on top of the epoch offset to compensate for
/// Excel treating 1900 as a leap year.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let ms = ((serial - EXCEL_UNIX_EPOCH_DAYS - 1.0) * MS_PER_DAY).round();
    let delta = TimeDelta::try_milliseconds(ms as i64)?;
    NaiveDate::from_ymd_opt(1970, 1, 1)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(delta)
}

/// `20230103` style integers. The caller has already checked for eight
/// digits; `None` means the digits do not name a real calendar day.
fn compact_date_to_datetime(digits: &str) -> Option<NaiveDateTime> {
    let year = digits[0..4].parse::<i32>().ok()?;
    let month = digits[4..6].parse::<u32>().ok()?;
    let day = digits[6..8].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

fn is_slash_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('/').collect();
    parts.len() == 3
        && parts[0].len() == 4
        && parts[1..].iter().all(|p| (1..=2).contains(&p.len()))
        && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
}

/// Parse a hand-typed date string. `YYYY/MM/DD` is rewritten to
/// `YYYY-MM-DD` first.
pub fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    let mut s = s.trim().to_string();
    if s.is_empty() {
        return None;
    }
    if is_slash_date(&s) {
        s = s.replace('/', "-");
    }
    // Offset timestamps keep the wall-clock date they state.
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Turn an inspection-date cell into a timestamp, or `None` if the cell is
/// empty or not a recognisable date.
pub fn cell_to_datetime(cell: &Cell) -> Option<NaiveDateTime> {
    if !cell.is_present() {
        return None;
    }
    match cell {
        Cell::Number(n) => {
            let digits = format!("{}", n.round() as i64);
            if digits.len() == 8 {
                compact_date_to_datetime(&digits)
            } else {
                excel_serial_to_datetime(*n)
            }
        }
        Cell::Text(s) => parse_date_str(s),
        Cell::Bool(_) | Cell::Empty => None,
    }
}

pub fn is_valid_date(cell: &Cell) -> bool {
    cell_to_datetime(cell).is_some()
}

/// Parse the longest leading decimal literal of `s`, the way spreadsheet
/// formulas and browsers treat `"95.3%"` as `95.3`.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}

/// Fixed-point formatting that rounds halves away from zero on the exact
/// binary value (so `0.125` becomes `"0.13"`), unlike `format!` which rounds
/// halves to even. Magnitudes of 1e21 and above come back in exponent form
/// (`"1e+40"`), the way spreadsheet and browser number formatting does.
pub fn to_fixed(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    if n.abs() >= FIXED_NOTATION_LIMIT {
        return exponent_form(n);
    }
    const GUARD: usize = 30;
    let exact = format!("{:.*}", decimals + GUARD, n.abs());
    let (kept, dropped) = exact.split_at(exact.len() - GUARD);
    let round_up = dropped.as_bytes().first().is_some_and(|d| *d >= b'5');

    let mut digits: Vec<u8> = kept.bytes().filter(|c| *c != b'.').collect();
    if round_up {
        increment_digits(&mut digits);
    }
    let mut body: String = digits.into_iter().map(char::from).collect();
    if decimals > 0 {
        body.insert(body.len() - decimals, '.');
    }
    if n < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

const FIXED_NOTATION_LIMIT: f64 = 1e21;

/// `1e40` -> `"1e+40"`, `-1.5e21` -> `"-1.5e+21"`.
fn exponent_form(n: f64) -> String {
    let s = format!("{:e}", n);
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => s,
    }
}

/// Add one to an ASCII decimal digit string, carrying into a new leading
/// digit when every digit was 9.
fn increment_digits(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

/// Round to two decimals with the same half-up rule as [`to_fixed`].
pub fn round2(n: f64) -> f64 {
    to_fixed(n, 2).parse().unwrap_or(0.0)
}

/// `part / whole * 100`, defined as 0 for an empty whole.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` (or `YYYY/MM/DD`) boundary date.
pub fn parse_boundary_date(s: &str) -> Option<NaiveDate> {
    parse_date_str(s).map(|dt| dt.date())
}

/// Character count used for the short-text heuristics (unknown judgement
/// tokens, free-text dispositions).
pub fn text_len(s: &str) -> usize {
    s.chars().count()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `9,855 rows loaded`.
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn excel_serial_lands_in_2023() {
        let dt = excel_serial_to_datetime(45000.0).unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2023, 3, 14).unwrap());
    }

    #[test]
    fn compact_dates_and_serials() {
        assert_eq!(cell_to_datetime(&Cell::Number(20230103.0)), Some(ymd(2023, 1, 3)));
        assert_eq!(cell_to_datetime(&Cell::Number(20231341.0)), None);
        assert!(cell_to_datetime(&Cell::Number(45292.0)).is_some());
        assert_eq!(cell_to_datetime(&Cell::Number(0.0)), None);
    }

    #[test]
    fn date_strings() {
        assert_eq!(parse_date_str("2025/1/5"), Some(ymd(2025, 1, 5)));
        assert_eq!(parse_date_str("2025-01-05"), Some(ymd(2025, 1, 5)));
        assert_eq!(parse_date_str("2025.1.5"), Some(ymd(2025, 1, 5)));
        assert_eq!(
            parse_date_str("2025-01-05 08:30:00"),
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap().and_hms_opt(8, 30, 0)
        );
        assert_eq!(parse_date_str("not-a-date"), None);
        assert_eq!(parse_date_str(""), None);
        assert!(!is_valid_date(&Cell::from("not-a-date")));
    }

    #[test]
    fn float_prefix() {
        assert_eq!(parse_float_prefix("95.3%"), Some(95.3));
        assert_eq!(parse_float_prefix("  0.953"), Some(0.953));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("1e2x"), Some(100.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix("-"), None);
    }

    #[test]
    fn fixed_point_rounding() {
        assert_eq!(to_fixed(95.3, 2), "95.30");
        assert_eq!(to_fixed(0.953 * 100.0, 2), "95.30");
        assert_eq!(to_fixed(0.125, 2), "0.13");
        assert_eq!(to_fixed(200.0 / 3.0, 2), "66.67");
        assert_eq!(to_fixed(-1.5, 0), "-2");
        assert_eq!(to_fixed(3.0, 0), "3");
        assert_eq!(round2(100.0 * 2.0 / 3.0), 66.67);
        assert_eq!(to_fixed(0.999, 2), "1.00");
        assert_eq!(to_fixed(99.999, 2), "100.00");
    }

    #[test]
    fn huge_values_switch_to_exponent_form() {
        assert_eq!(to_fixed(1e40, 2), "1e+40");
        assert_eq!(to_fixed(1e38, 2), "1e+38");
        assert_eq!(to_fixed(-1.5e21, 2), "-1.5e+21");
        assert_eq!(to_fixed(1e20, 0), "100000000000000000000");
        assert_eq!(round2(1e40), 1e40);
    }

    #[test]
    fn offset_timestamps_keep_their_calendar_date() {
        let dt = parse_date_str("2025-02-01T03:00:00+08:00").unwrap();
        assert_eq!(dt, ymd(2025, 2, 1).date().and_hms_opt(3, 0, 0).unwrap());
        assert_eq!(
            parse_date_str("2025-01-31T23:30:00Z"),
            ymd(2025, 1, 31).date().and_hms_opt(23, 30, 0)
        );
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 2), 50.0);
    }
}
