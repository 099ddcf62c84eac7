//! ISO 8601 duration normalization.
//!
//! Accepted input:
//! - ISO 8601 durations (`P1Y2M`, `pt2h30m`, `P3W`), re-emitted upper-case
//! - bare numbers, read as days (`5` -> `P5D`, `1.5` -> `P1DT12H`)
//! - text with units (`5 days`, `2 hours 30 minutes`, `3wk`, `45 min`)

use crate::data_utils::{format_numeric, parse_f64};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Components {
    years: Option<f64>,
    months: Option<f64>,
    weeks: Option<f64>,
    days: Option<f64>,
    hours: Option<f64>,
    minutes: Option<f64>,
    seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl Unit {
    fn parse(text: &str) -> Option<Self> {
        let unit = match text {
            "Y" | "YR" | "YRS" | "YEAR" | "YEARS" => Self::Year,
            "MO" | "MOS" | "MON" | "MONTH" | "MONTHS" => Self::Month,
            "W" | "WK" | "WKS" | "WEEK" | "WEEKS" => Self::Week,
            "D" | "DAY" | "DAYS" => Self::Day,
            "H" | "HR" | "HRS" | "HOUR" | "HOURS" => Self::Hour,
            "MIN" | "MINS" | "MINUTE" | "MINUTES" => Self::Minute,
            "S" | "SEC" | "SECS" | "SECOND" | "SECONDS" => Self::Second,
            _ => return None,
        };
        Some(unit)
    }
}

impl Components {
    fn set(&mut self, unit: Unit, value: f64) -> Option<()> {
        let slot = match unit {
            Unit::Year => &mut self.years,
            Unit::Month => &mut self.months,
            Unit::Week => &mut self.weeks,
            Unit::Day => &mut self.days,
            Unit::Hour => &mut self.hours,
            Unit::Minute => &mut self.minutes,
            Unit::Second => &mut self.seconds,
        };
        if slot.is_some() {
            return None;
        }
        *slot = Some(value);
        Some(())
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn render(mut self) -> String {
        let has_other = self.years.is_some()
            || self.months.is_some()
            || self.days.is_some()
            || self.hours.is_some()
            || self.minutes.is_some()
            || self.seconds.is_some();
        if has_other && let Some(weeks) = self.weeks.take() {
            self.days = Some(self.days.unwrap_or(0.0) + weeks * 7.0);
        }
        let mut out = String::from("P");
        for (value, designator) in [
            (self.years, 'Y'),
            (self.months, 'M'),
            (self.weeks, 'W'),
            (self.days, 'D'),
        ] {
            if let Some(value) = value {
                out.push_str(&format_numeric(value));
                out.push(designator);
            }
        }
        if self.hours.is_some() || self.minutes.is_some() || self.seconds.is_some() {
            out.push('T');
            for (value, designator) in [(self.hours, 'H'), (self.minutes, 'M'), (self.seconds, 'S')]
            {
                if let Some(value) = value {
                    out.push_str(&format_numeric(value));
                    out.push(designator);
                }
            }
        }
        out
    }
}

/// Normalize a raw duration. Returns `None` for blank or unparsable input.
///
/// ```
/// use sdtm_core::duration::normalize_duration;
///
/// assert_eq!(normalize_duration("pt2h").as_deref(), Some("PT2H"));
/// assert_eq!(normalize_duration("5").as_deref(), Some("P5D"));
/// assert_eq!(normalize_duration("2 hours 30 minutes").as_deref(), Some("PT2H30M"));
/// assert_eq!(normalize_duration("soon"), None);
/// ```
pub fn normalize_duration(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }
    if upper.starts_with('P') {
        return is_iso_duration(&upper).then_some(upper);
    }
    if let Some(days) = parse_f64(&upper) {
        return days_to_duration(days);
    }
    parse_text_duration(&upper).map(Components::render)
}

/// Validate `P[nY][nM][nW][nD][T[nH][nM][nS]]`. Only the last component may be fractional.
pub fn is_iso_duration(value: &str) -> bool {
    let Some(body) = value.strip_prefix('P') else {
        return false;
    };
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };
    let mut seen_fraction = false;
    let mut components = 0usize;
    let Some(date_count) = scan_components(date_part, "YMWD", &mut seen_fraction) else {
        return false;
    };
    components += date_count;
    if let Some(time_part) = time_part {
        match scan_components(time_part, "HMS", &mut seen_fraction) {
            Some(0) | None => return false,
            Some(count) => components += count,
        }
    }
    components > 0
}

/// Counts `<number><designator>` pairs; designators must appear in `order`.
fn scan_components(text: &str, order: &str, seen_fraction: &mut bool) -> Option<usize> {
    let mut count = 0;
    let mut number = String::new();
    let mut position = 0;
    for ch in text.chars() {
        if ch.is_ascii_digit() || ch == '.' || ch == ',' {
            number.push(ch);
            continue;
        }
        let index = order[position..].find(ch)? + position;
        if number.is_empty() || *seen_fraction {
            return None;
        }
        if number.contains(['.', ',']) {
            *seen_fraction = true;
        }
        parse_f64(&number.replace(',', "."))?;
        number.clear();
        position = index + 1;
        count += 1;
    }
    if !number.is_empty() {
        return None;
    }
    Some(count)
}

fn days_to_duration(days: f64) -> Option<String> {
    if days < 0.0 {
        return None;
    }
    let total_minutes = (days * 24.0 * 60.0).round() as i64;
    let (whole_days, rest) = (total_minutes / 1440, total_minutes % 1440);
    let (hours, minutes) = (rest / 60, rest % 60);
    let mut out = String::from("P");
    if whole_days > 0 || rest == 0 {
        out.push_str(&format!("{whole_days}D"));
    }
    if rest > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
    }
    Some(out)
}

fn parse_text_duration(text: &str) -> Option<Components> {
    let mut components = Components::default();
    let mut tokens = split_number_unit(text).into_iter().peekable();
    while let Some(token) = tokens.next() {
        let value = parse_f64(&token)?;
        if value < 0.0 {
            return None;
        }
        let unit = tokens.next().and_then(|unit| Unit::parse(&unit))?;
        components.set(unit, value)?;
        while tokens.peek().is_some_and(|next| next == "AND") {
            tokens.next();
        }
    }
    (!components.is_empty()).then_some(components)
}

/// Split `2HOURS 30 MIN` into `["2", "HOURS", "30", "MIN"]`.
fn split_number_unit(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_numeric = false;
    for ch in text.chars() {
        if ch.is_whitespace() || ch == ',' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        let numeric = ch.is_ascii_digit() || ch == '.';
        if !current.is_empty() && numeric != current_numeric {
            tokens.push(std::mem::take(&mut current));
        }
        current_numeric = numeric;
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_durations_are_validated() {
        for value in ["P1Y2M10DT2H30M", "PT2H", "P3W", "P0.5D", "PT1.5H"] {
            assert!(is_iso_duration(value), "{value}");
        }
        for value in ["P", "PT", "P1H", "PT1D", "P1.5DT2H", "P2D1Y", "PXD"] {
            assert!(!is_iso_duration(value), "{value}");
        }
    }

    #[test]
    fn numbers_are_days() {
        assert_eq!(normalize_duration("0").as_deref(), Some("P0D"));
        assert_eq!(normalize_duration("1.5").as_deref(), Some("P1DT12H"));
        assert_eq!(normalize_duration("0.25").as_deref(), Some("PT6H"));
        assert_eq!(normalize_duration("-2"), None);
    }

    #[test]
    fn text_units() {
        assert_eq!(normalize_duration("5 days").as_deref(), Some("P5D"));
        assert_eq!(normalize_duration("3wk").as_deref(), Some("P3W"));
        assert_eq!(normalize_duration("1 week 2 days").as_deref(), Some("P9D"));
        assert_eq!(normalize_duration("1 year and 2 months").as_deref(), Some("P1Y2M"));
        assert_eq!(normalize_duration("45 min").as_deref(), Some("PT45M"));
        assert_eq!(normalize_duration("2 days 2 days"), None);
        assert_eq!(normalize_duration("days"), None);
    }
}
