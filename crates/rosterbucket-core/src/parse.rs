//! Input parsing for schedule fields.
//!
//! This module parses the loosely formatted strings found in schedule rows:
//! - clock times: `4:00 PM`, `12:30:00 AM`, `400 PM`, `16:00`
//! - day-offset notations: `+12:45 AM`, `+2 02:00 AM`, `02:00 AM +`, `02:00 AM +2`
//! - durations: `2:30`, `0:15:30`, `-1:05`
//! - dates: `MM/DD/YYYY` (ISO `YYYY-MM-DD` is accepted as well)

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{Result, RosterError};
use crate::models::{MINUTES_PER_DAY, ParsedTime};

/// Sentinel used in start/end columns for an all-day record.
pub const FULL_DAY_SENTINEL: &str = "FULL DAY";

/// Hour, minutes, optional seconds and optional meridiem. The colon
/// between hour and minutes may be missing (`400 PM`).
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):?(\d{2})(?::(\d{2}))?\s*(AM|PM)?$").expect("clock regex is valid")
});

/// Bare hour with a meridiem (`4 PM`).
static HOUR_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s*(AM|PM)$").expect("hour regex is valid"));

/// `2 02:00 AM` once the leading `+` has been removed.
static PREFIX_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(\S.*)$").expect("prefix regex is valid"));

/// `02:00 AM +2`.
static SUFFIX_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*\+\s*(\d+)$").expect("suffix regex is valid"));

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?)(\d+):(\d{2})(?::(\d{2}))?").expect("duration regex is valid")
});

/// Whether `text` is the full-day sentinel (case and spacing insensitive).
pub fn is_full_day(text: &str) -> bool {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.eq_ignore_ascii_case(FULL_DAY_SENTINEL)
}

/// Parse a clock time into minutes after midnight.
///
/// Returns `None` for blank input, for the full-day sentinel and for
/// anything that does not look like a clock time. Callers that need to tell
/// the sentinel apart from garbage check [`is_full_day`] themselves.
///
/// Seconds are accepted and truncated.
///
/// # Examples
///
/// ```
/// use rosterbucket_core::parse::parse_clock_time;
///
/// assert_eq!(parse_clock_time("4:00 PM"), Some(960));
/// assert_eq!(parse_clock_time("12:30:00 AM"), Some(30));
/// assert_eq!(parse_clock_time("400 PM"), Some(960));
/// assert_eq!(parse_clock_time("Full Day"), None);
/// ```
pub fn parse_clock_time(text: &str) -> Option<u32> {
    let normalized = text.trim().to_ascii_uppercase().replace('.', "");
    if normalized.is_empty() || is_full_day(&normalized) {
        return None;
    }

    if let Some(caps) = CLOCK_RE.captures(&normalized) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        if minute >= 60 {
            return None;
        }
        if let Some(seconds) = caps.get(3) {
            let seconds: u32 = seconds.as_str().parse().ok()?;
            if seconds >= 60 {
                return None;
            }
        }
        let hour = to_24_hour(hour, caps.get(4).map(|m| m.as_str()))?;
        return Some(hour * 60 + minute);
    }

    if let Some(caps) = HOUR_ONLY_RE.captures(&normalized) {
        let hour: u32 = caps[1].parse().ok()?;
        let hour = to_24_hour(hour, Some(&caps[2]))?;
        return Some(hour * 60);
    }

    None
}

fn to_24_hour(hour: u32, meridiem: Option<&str>) -> Option<u32> {
    match meridiem {
        Some("AM") if (1..=12).contains(&hour) => Some(hour % 12),
        Some("PM") if (1..=12).contains(&hour) => Some(hour % 12 + 12),
        None if hour < 24 => Some(hour),
        _ => None,
    }
}

/// Parse a clock time that may carry a `+` day-offset marker.
///
/// A leading `+` directly followed by a clock time is exactly one day; the
/// digits belong to the time. A leading `+N` separated by whitespace from
/// the clock time is an explicit day count. The same holds for a trailing
/// marker. When both a leading and a trailing marker are present the
/// leading one decides. A marker with nothing else usable is one day.
///
/// # Examples
///
/// ```
/// use rosterbucket_core::parse::parse_clock_time_with_day_offset;
///
/// let parsed = parse_clock_time_with_day_offset("+12:45 AM");
/// assert_eq!((parsed.minutes, parsed.day_offset), (Some(45), 1));
///
/// let parsed = parse_clock_time_with_day_offset("+2 02:00 AM");
/// assert_eq!((parsed.minutes, parsed.day_offset), (Some(120), 2));
/// ```
pub fn parse_clock_time_with_day_offset(text: &str) -> ParsedTime {
    let (prefix_offset, rest) = split_prefix_marker(text.trim());
    let (suffix_offset, time_text) = split_suffix_marker(rest);

    ParsedTime {
        minutes: parse_clock_time(time_text),
        day_offset: prefix_offset.or(suffix_offset).unwrap_or(0),
    }
}

fn split_prefix_marker(text: &str) -> (Option<u32>, &str) {
    let Some(rest) = text.strip_prefix('+') else {
        return (None, text);
    };
    let rest = rest.trim_start();

    if let Some(caps) = PREFIX_COUNT_RE.captures(rest) {
        let time = caps.get(2).map_or("", |m| m.as_str());
        let days = caps[1].parse::<u32>().ok();
        if days.is_some() && parse_clock_time(split_suffix_marker(time).1).is_some() {
            return (days, time);
        }
    }

    (Some(1), rest)
}

fn split_suffix_marker(text: &str) -> (Option<u32>, &str) {
    let trimmed = text.trim_end();
    if let Some(head) = trimmed.strip_suffix('+') {
        return (Some(1), head.trim_end());
    }

    if let Some(caps) = SUFFIX_COUNT_RE.captures(trimmed) {
        let head = caps.get(1).map_or("", |m| m.as_str());
        let days = caps[2].parse::<u32>().ok();
        if days.is_some() && parse_clock_time(head).is_some() {
            return (days, head);
        }
    }

    (None, trimmed)
}

/// Format minutes after midnight as a 12-hour clock string (`9:05 PM`).
///
/// Values of a full day or more wrap around.
pub fn minutes_to_time_string(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let hour = minutes / 60;
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    let hour_12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour_12, minutes % 60, meridiem)
}

/// Parse an authoritative duration string (`H+:MM` or `H+:MM:SS`).
///
/// The first match anywhere in the text is used. Seconds are rounded to
/// the nearest minute; a leading `-` is kept.
pub fn parse_duration_minutes(text: &str) -> Option<i64> {
    let caps = DURATION_RE.captures(text)?;
    let hours: i64 = caps[2].parse().ok()?;
    let minutes: i64 = caps[3].parse().ok()?;
    let seconds: i64 = match caps.get(4) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };

    let total = hours.checked_mul(60)?.checked_add(minutes)? + i64::from(seconds >= 30);
    if &caps[1] == "-" {
        Some(-total)
    } else {
        Some(total)
    }
}

/// Format minutes as `H:MM`, rounded to the nearest minute.
pub fn format_duration(minutes: f64) -> String {
    let rounded = minutes.round() as i64;
    let sign = if rounded < 0 { "-" } else { "" };
    let abs = rounded.abs();
    format!("{}{}:{:02}", sign, abs / 60, abs % 60)
}

/// Parse a schedule date, `MM/DD/YYYY` or `YYYY-MM-DD`.
pub fn parse_schedule_date(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|e| RosterError::InvalidDate(format!("'{}': {}", text, e)))
}

/// Format a date as `MM/DD/YYYY`.
pub fn format_schedule_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}
