//! Date/time normalization to ISO 8601 extended format.
//!
//! Source exports carry dates in many shapes. [`normalize_datetime`] accepts:
//!
//! - ISO 8601 at any precision (`2024`, `2024-03`, `2024-03-05T14:30:00`), with
//!   `T` or a space before the time, and intervals (`start/end`)
//! - `DD-MON-YYYY`, `DD MON YYYY`, `DDMONYYYY`, `MON-YYYY`, `MONYYYY`
//! - `MM/DD/YYYY`, read as `DD/MM/YYYY` when the first field exceeds 12
//! - `DD.MM.YYYY` and `YYYYMMDD`
//!
//! Any of these may be followed by `HH:MM[:SS]`. A trailing UTC designator or
//! offset (`Z`, `+01:00`, `-0500`) is dropped. An unknown day (`UN`, `UNK`,
//! `XX`) is read as day `01`. Output is right-truncated ISO 8601:
//! `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or `YYYY-MM-DDThh:mm[:ss]`.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveTime};

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const UNKNOWN_DAY_TOKENS: [&str; 3] = ["UNK", "UN", "XX"];

/// Precision of a normalized value, from the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Minute,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DatePart {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
}

impl DatePart {
    fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Option<Self> {
        if !(1000..=9999).contains(&year) {
            return None;
        }
        if let Some(month) = month
            && !(1..=12).contains(&month)
        {
            return None;
        }
        match (month, day) {
            (None, Some(_)) => None,
            (Some(month), Some(day)) => {
                NaiveDate::from_ymd_opt(year, month, day).map(|_| Self { year, month: Some(month), day: Some(day) })
            }
            _ => Some(Self { year, month, day }),
        }
    }

    fn is_complete(&self) -> bool {
        self.day.is_some()
    }

    fn render(&self) -> String {
        match (self.month, self.day) {
            (Some(month), Some(day)) => format!("{:04}-{:02}-{:02}", self.year, month, day),
            (Some(month), None) => format!("{:04}-{:02}", self.year, month),
            _ => format!("{:04}", self.year),
        }
    }
}

/// Normalize a raw date/time value to ISO 8601.
///
/// Returns `None` for blank or unparsable input.
///
/// ```
/// use sdtm_core::datetime::normalize_datetime;
///
/// assert_eq!(normalize_datetime("05-MAR-2024").as_deref(), Some("2024-03-05"));
/// assert_eq!(normalize_datetime("03/25/2024 14:30").as_deref(), Some("2024-03-25T14:30"));
/// assert_eq!(normalize_datetime("UN-JAN-2024").as_deref(), Some("2024-01-01"));
/// assert_eq!(normalize_datetime("not a date"), None);
/// ```
pub fn normalize_datetime(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let upper = trimmed.to_uppercase();
    if starts_with_year(&upper)
        && let Some((start, end)) = upper.split_once('/')
    {
        let start = normalize_single(start)?;
        let end = normalize_single(end)?;
        return Some(format!("{start}/{end}"));
    }
    normalize_single(&upper)
}

fn starts_with_year(value: &str) -> bool {
    value.len() >= 4 && value.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}

fn normalize_single(value: &str) -> Option<String> {
    let value = fill_unknown_day(value.trim());
    let (date_text, time_text) = split_date_time(&value);
    let date = parse_date_part(date_text)?;
    let mut out = date.render();
    if let Some(time_text) = time_text {
        if !date.is_complete() {
            return None;
        }
        out.push('T');
        out.push_str(&parse_time_part(strip_zone(time_text))?);
    }
    Some(out)
}

fn fill_unknown_day(value: &str) -> String {
    for token in UNKNOWN_DAY_TOKENS {
        if let Some(rest) = value.strip_prefix(token) {
            let next = rest.chars().next();
            let day_position = match next {
                Some(ch) => matches!(ch, '-' | '/' | '.' | ' ') || ch.is_ascii_alphabetic(),
                None => false,
            };
            if day_position {
                return format!("01{rest}");
            }
        }
        let suffix = format!("-{token}");
        if let Some(head) = value.strip_suffix(&suffix)
            && starts_with_year(head)
        {
            return format!("{head}-01");
        }
        let middle = format!("/{token}/");
        if value.contains(&middle) {
            return value.replacen(&middle, "/01/", 1);
        }
    }
    value.to_string()
}

fn split_date_time(value: &str) -> (&str, Option<&str>) {
    if starts_with_year(value)
        && let Some((date, time)) = value.split_once('T')
    {
        return (date.trim(), Some(time.trim()));
    }
    if let Some((date, time)) = value.rsplit_once(' ')
        && time.contains(':')
    {
        return (date.trim(), Some(time.trim()));
    }
    (value, None)
}

/// Time without its `Z` or `+hh[:mm]`/`-hh[:mm]` suffix.
fn strip_zone(time: &str) -> &str {
    if let Some(local) = time.strip_suffix('Z') {
        return local.trim_end();
    }
    let Some(idx) = time.rfind(['+', '-']) else {
        return time;
    };
    let offset: String = time[idx + 1..].chars().filter(|c| *c != ':').collect();
    if matches!(offset.len(), 2 | 4) && offset.bytes().all(|b| b.is_ascii_digit()) {
        time[..idx].trim_end()
    } else {
        time
    }
}

fn parse_date_part(text: &str) -> Option<DatePart> {
    if text.is_empty() {
        return None;
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return match text.len() {
            4 => DatePart::new(text.parse().ok()?, None, None),
            8 => DatePart::new(
                text[..4].parse().ok()?,
                Some(text[4..6].parse().ok()?),
                Some(text[6..].parse().ok()?),
            ),
            _ => None,
        };
    }
    if starts_with_year(text) && text.as_bytes().get(4) == Some(&b'-') {
        return parse_iso_date(text);
    }
    if text.contains('/') {
        return parse_slash_date(text);
    }
    if text.contains('.') {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        return DatePart::new(
            parse_year(parts[2])?,
            Some(parts[1].parse().ok()?),
            Some(parts[0].parse().ok()?),
        );
    }
    parse_month_name_date(text)
}

fn parse_year(text: &str) -> Option<i32> {
    if text.len() != 4 {
        return None;
    }
    text.parse().ok()
}

fn parse_iso_date(text: &str) -> Option<DatePart> {
    let parts: Vec<&str> = text.split('-').collect();
    let year = parse_year(parts[0])?;
    let two_digits = |part: &str| -> Option<u32> {
        if part.len() == 2 { part.parse().ok() } else { None }
    };
    match parts.len() {
        2 => DatePart::new(year, Some(two_digits(parts[1])?), None),
        3 => DatePart::new(year, Some(two_digits(parts[1])?), Some(two_digits(parts[2])?)),
        _ => None,
    }
}

fn parse_slash_date(text: &str) -> Option<DatePart> {
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let first: u32 = parts[0].parse().ok()?;
    let second: u32 = parts[1].parse().ok()?;
    let year = parse_year(parts[2])?;
    if first > 12 {
        DatePart::new(year, Some(second), Some(first))
    } else {
        DatePart::new(year, Some(first), Some(second))
    }
}

/// `DD-MON-YYYY`, `DD MON YYYY`, `DDMONYYYY`, `MON-YYYY`, `MONYYYY`.
fn parse_month_name_date(text: &str) -> Option<DatePart> {
    let compact: String = text.chars().filter(|c| !matches!(c, '-' | ' ')).collect();
    let letters_start = compact.find(|c: char| c.is_ascii_alphabetic())?;
    let letters_end = compact[letters_start..]
        .find(|c: char| !c.is_ascii_alphabetic())
        .map(|offset| letters_start + offset)?;
    let day_text = &compact[..letters_start];
    let month_text = &compact[letters_start..letters_end];
    let year = parse_year(&compact[letters_end..])?;
    let month = MONTHS
        .iter()
        .position(|name| month_text.len() >= 3 && month_text.starts_with(name))
        .map(|idx| idx as u32 + 1)?;
    if day_text.is_empty() {
        return DatePart::new(year, Some(month), None);
    }
    if day_text.len() > 2 {
        return None;
    }
    DatePart::new(year, Some(month), Some(day_text.parse().ok()?))
}

fn parse_time_part(text: &str) -> Option<String> {
    let parts: Vec<&str> = text.split(':').collect();
    let number = |part: &str| -> Option<u32> {
        if (1..=2).contains(&part.len()) { part.parse().ok() } else { None }
    };
    match parts.as_slice() {
        [hour, minute] => {
            let (hour, minute) = (number(hour)?, number(minute)?);
            NaiveTime::from_hms_opt(hour, minute, 0)?;
            Some(format!("{hour:02}:{minute:02}"))
        }
        [hour, minute, second] => {
            let whole = second.split('.').next().unwrap_or(second);
            let (hour, minute, second) = (number(hour)?, number(minute)?, number(whole)?);
            NaiveTime::from_hms_opt(hour, minute, second)?;
            Some(format!("{hour:02}:{minute:02}:{second:02}"))
        }
        _ => None,
    }
}

/// Precision of an already-normalized ISO 8601 value.
pub fn precision(iso: &str) -> Option<DateTimePrecision> {
    let iso = iso.trim();
    let (date, time) = match iso.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (iso, None),
    };
    let precision = match (date.len(), time.map(str::len)) {
        (4, None) => DateTimePrecision::Year,
        (7, None) => DateTimePrecision::Month,
        (10, None) => DateTimePrecision::Day,
        (10, Some(5)) => DateTimePrecision::Minute,
        (10, Some(8)) => DateTimePrecision::Second,
        _ => return None,
    };
    Some(precision)
}

/// Complete calendar date of an ISO 8601 value; `None` for partial dates and intervals.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.contains('/') {
        return None;
    }
    let date = value.split('T').next()?;
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Study day of `obs_date` relative to `ref_date`. There is no day 0.
///
/// ```
/// use sdtm_core::datetime::calculate_study_day;
///
/// assert_eq!(calculate_study_day("2023-01-01", "2023-01-01"), Some(1));
/// assert_eq!(calculate_study_day("2022-12-31", "2023-01-01"), Some(-1));
/// assert_eq!(calculate_study_day("2023-01", "2023-01-01"), None);
/// ```
pub fn calculate_study_day(obs_date: &str, ref_date: &str) -> Option<i64> {
    let obs = parse_date(obs_date)?;
    let reference = parse_date(ref_date)?;
    let delta = obs.signed_duration_since(reference).num_days();
    Some(if delta >= 0 { delta + 1 } else { delta })
}

/// Compare two normalized values at their common precision.
///
/// Returns `None` when either is blank or an interval, or when they share no
/// comparable prefix.
pub fn compare_iso8601(a: &str, b: &str) -> Option<Ordering> {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() || a.contains('/') || b.contains('/') {
        return None;
    }
    let common = a.len().min(b.len());
    if common < 4 {
        return None;
    }
    Some(a[..common].cmp(&b[..common]))
}

/// True when both dates are present and `end` is strictly before `start`.
pub fn end_before_start(start: &str, end: &str) -> bool {
    compare_iso8601(start, end) == Some(Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn iso_precisions_pass_through() {
        for value in ["2024", "2024-03", "2024-03-05", "2024-03-05T14:30", "2024-03-05T14:30:15"] {
            assert_eq!(normalize_datetime(value).as_deref(), Some(value));
        }
        assert_eq!(
            normalize_datetime("2024-03-05 14:30:15.250").as_deref(),
            Some("2024-03-05T14:30:15")
        );
    }

    #[test]
    fn common_export_formats() {
        let cases = [
            ("05-Mar-2024", "2024-03-05"),
            ("5 MAR 2024", "2024-03-05"),
            ("05MAR2024", "2024-03-05"),
            ("MAR-2024", "2024-03"),
            ("mar2024", "2024-03"),
            ("03/05/2024", "2024-03-05"),
            ("25/03/2024", "2024-03-25"),
            ("25.03.2024", "2024-03-25"),
            ("20240325", "2024-03-25"),
            ("25-MAR-2024 08:05", "2024-03-25T08:05"),
            ("5 OCT 2024 08:05:09", "2024-10-05T08:05:09"),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_datetime(raw).as_deref(), Some(expected), "{raw}");
        }
    }

    #[test]
    fn unknown_day_becomes_first() {
        assert_eq!(normalize_datetime("UNK-MAR-2024").as_deref(), Some("2024-03-01"));
        assert_eq!(normalize_datetime("UNMAR2024").as_deref(), Some("2024-03-01"));
        assert_eq!(normalize_datetime("2024-03-UN").as_deref(), Some("2024-03-01"));
        assert_eq!(normalize_datetime("03/XX/2024").as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn garbage_is_rejected() {
        for raw in ["", "unknown", "2024-13-01", "2024-02-30", "31/31/2024", "2024-03T10:00", "12:00"] {
            assert_eq!(normalize_datetime(raw), None, "{raw}");
        }
    }

    #[test]
    fn zone_suffix_is_dropped() {
        let cases = [
            ("2023-01-05T14:30:00Z", "2023-01-05T14:30:00"),
            ("2023-01-05t14:30z", "2023-01-05T14:30"),
            ("2023-01-05T14:30:00+01:00", "2023-01-05T14:30:00"),
            ("2023-01-05T14:30-0500", "2023-01-05T14:30"),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_datetime(raw).as_deref(), Some(expected), "{raw}");
        }
        assert_eq!(normalize_datetime("2023-01-05T14:30+1"), None);
    }

    #[test]
    fn intervals_normalize_both_ends() {
        assert_eq!(
            normalize_datetime("2024-03-01/2024-03-05").as_deref(),
            Some("2024-03-01/2024-03-05")
        );
    }

    #[test]
    fn date_pairs_compare_at_common_precision() {
        assert!(end_before_start("2024-03-05", "2024-03-01"));
        assert!(!end_before_start("2024-03", "2024-03-01"));
        assert!(!end_before_start("2024-03-05", ""));
        assert_eq!(precision("2024-03-05T10:00"), Some(DateTimePrecision::Minute));
    }

    proptest! {
        #[test]
        fn study_day_is_never_zero(offset in -2000i64..2000) {
            let reference = NaiveDate::from_ymd_opt(2023, 1, 1).expect("date");
            let obs = reference + chrono::Duration::days(offset);
            let day = calculate_study_day(&obs.format("%Y-%m-%d").to_string(), "2023-01-01")
                .expect("complete dates");
            prop_assert_ne!(day, 0);
            prop_assert_eq!(day > 0, offset >= 0);
        }

        #[test]
        fn normalization_is_idempotent(y in 1900i32..2100, m in 1u32..=12, d in 1u32..=28) {
            let raw = format!("{d:02}/{m:02}/{y}");
            if let Some(first) = normalize_datetime(&raw) {
                prop_assert_eq!(normalize_datetime(&first), Some(first.clone()));
            }
        }
    }
}
