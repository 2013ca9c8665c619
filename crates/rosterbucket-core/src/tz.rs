//! Timezone handling utilities.
//!
//! This module resolves the free-form timezone strings found in schedule
//! rows to IANA zones and converts local schedule times into the reference
//! zone with proper DST handling.
//!
//! Conversion never fails from the caller's point of view:
//! [`convert_to_reference`] tries the exact IANA conversion first, then a
//! fixed seasonal-offset approximation, then the identity mapping.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone,
    Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{Result, RosterError};
use crate::models::{ConversionMethod, MINUTES_PER_DAY};

/// Known abbreviations, underscore variants and misspellings.
///
/// Keys are uppercase with whitespace and hyphens folded to `_`.
const ZONE_ALIASES: &[(&str, &str)] = &[
    ("EST", "America/New_York"),
    ("EDT", "America/New_York"),
    ("ET", "America/New_York"),
    ("EASTERN", "America/New_York"),
    ("EASTERN_TIME", "America/New_York"),
    ("US/EASTERN", "America/New_York"),
    ("AMERICA/NEWYORK", "America/New_York"),
    ("AMERICA/NEW_YORK_CITY", "America/New_York"),
    ("CST", "America/Chicago"),
    ("CDT", "America/Chicago"),
    ("CT", "America/Chicago"),
    ("CENTRAL", "America/Chicago"),
    ("CENTRAL_TIME", "America/Chicago"),
    ("US/CENTRAL", "America/Chicago"),
    ("MST", "America/Denver"),
    ("MDT", "America/Denver"),
    ("MT", "America/Denver"),
    ("MOUNTAIN", "America/Denver"),
    ("US/MOUNTAIN", "America/Denver"),
    ("ARIZONA", "America/Phoenix"),
    ("MST_ARIZONA", "America/Phoenix"),
    ("US/ARIZONA", "America/Phoenix"),
    ("PST", "America/Los_Angeles"),
    ("PDT", "America/Los_Angeles"),
    ("PT", "America/Los_Angeles"),
    ("PACIFIC", "America/Los_Angeles"),
    ("PACIFIC_TIME", "America/Los_Angeles"),
    ("US/PACIFIC", "America/Los_Angeles"),
    ("AMERICA/LOSANGELES", "America/Los_Angeles"),
    ("AKST", "America/Anchorage"),
    ("AKDT", "America/Anchorage"),
    ("ALASKA", "America/Anchorage"),
    ("HST", "Pacific/Honolulu"),
    ("HAWAII", "Pacific/Honolulu"),
    ("IST", "Asia/Kolkata"),
    ("INDIA", "Asia/Kolkata"),
    ("KOLKATA", "Asia/Kolkata"),
    ("ASIA/CALCUTTA", "Asia/Kolkata"),
    ("ASIA/CALCUTA", "Asia/Kolkata"),
    ("ASIA/KOLKOTA", "Asia/Kolkata"),
    ("ASIA/KOLKATTA", "Asia/Kolkata"),
    ("PHT", "Asia/Manila"),
    ("PHST", "Asia/Manila"),
    ("PST_PH", "Asia/Manila"),
    ("PHILIPPINES", "Asia/Manila"),
    ("MANILA", "Asia/Manila"),
    ("ASIA/MANNILA", "Asia/Manila"),
    ("GMT", "UTC"),
    ("UTC", "UTC"),
    ("Z", "UTC"),
    ("ZULU", "UTC"),
    ("BST", "Europe/London"),
    ("UK", "Europe/London"),
    ("LONDON", "Europe/London"),
    ("CET", "Europe/Berlin"),
    ("CEST", "Europe/Berlin"),
    ("AEST", "Australia/Sydney"),
    ("AEDT", "Australia/Sydney"),
    ("SYDNEY", "Australia/Sydney"),
    ("JST", "Asia/Tokyo"),
    ("JAPAN", "Asia/Tokyo"),
    ("SGT", "Asia/Singapore"),
    ("SINGAPORE", "Asia/Singapore"),
];

/// Seasonal DST rule used by the approximation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DstRule {
    None,
    /// Second Sunday of March to first Sunday of November.
    NorthAmerica,
    /// Last Sunday of March to last Sunday of October.
    Europe,
    /// First Sunday of October to first Sunday of April.
    Australia,
}

/// Zone name, standard offset, DST offset (minutes east of UTC), rule.
const SEASONAL_PROFILES: &[(&str, i32, i32, DstRule)] = &[
    ("America/New_York", -300, -240, DstRule::NorthAmerica),
    ("America/Chicago", -360, -300, DstRule::NorthAmerica),
    ("America/Denver", -420, -360, DstRule::NorthAmerica),
    ("America/Phoenix", -420, -420, DstRule::None),
    ("America/Los_Angeles", -480, -420, DstRule::NorthAmerica),
    ("America/Anchorage", -540, -480, DstRule::NorthAmerica),
    ("Pacific/Honolulu", -600, -600, DstRule::None),
    ("Asia/Kolkata", 330, 330, DstRule::None),
    ("Asia/Manila", 480, 480, DstRule::None),
    ("Asia/Singapore", 480, 480, DstRule::None),
    ("Asia/Tokyo", 540, 540, DstRule::None),
    ("UTC", 0, 0, DstRule::None),
    ("Europe/London", 0, 60, DstRule::Europe),
    ("Europe/Berlin", 60, 120, DstRule::Europe),
    ("Australia/Sydney", 600, 660, DstRule::Australia),
];

/// A local time carried into the reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedTime {
    /// Minutes after midnight in the reference zone.
    pub minutes: u32,
    /// Calendar date in the reference zone.
    pub date: NaiveDate,
    /// The instant itself. Elapsed time between two converted times is
    /// measured here, never on the wall clock.
    pub instant: DateTime<Utc>,
    pub method: ConversionMethod,
}

/// Outcome of resolving a raw timezone string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneResolution {
    pub tz: Tz,
    /// Set when the raw string was not recognized and the reference zone
    /// was substituted.
    pub warning: Option<String>,
}

/// Parse an IANA timezone name into a [`chrono_tz::Tz`].
///
/// # Examples
///
/// ```
/// use rosterbucket_core::tz::parse_tz;
///
/// let tz = parse_tz("Australia/Sydney").unwrap();
/// assert_eq!(tz.to_string(), "Australia/Sydney");
/// ```
pub fn parse_tz(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| RosterError::UnknownTimezone(name.to_string()))
}

/// Map a raw timezone string to an IANA zone.
///
/// Known abbreviations and misspellings go through the alias table first
/// (so `EST` means US Eastern with DST, not the fixed-offset `EST` zone).
/// Strings shaped like `Region/City` pass through; lowercase spellings are
/// title-cased and retried.
///
/// # Examples
///
/// ```
/// use rosterbucket_core::tz::normalize_alias;
///
/// assert_eq!(normalize_alias("EST").unwrap().name(), "America/New_York");
/// assert_eq!(normalize_alias("Asia/Calcutta").unwrap().name(), "Asia/Kolkata");
/// assert!(normalize_alias("Mars/Olympus_Mons").is_err());
/// ```
pub fn normalize_alias(raw: &str) -> Result<Tz> {
    let key = alias_key(raw);
    if let Some((_, zone)) = ZONE_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return parse_tz(zone);
    }

    let underscored = raw.split_whitespace().collect::<Vec<_>>().join("_");
    if let Ok(tz) = parse_tz(&underscored) {
        return Ok(tz);
    }
    if underscored.contains('/') {
        if let Ok(tz) = parse_tz(&title_case_zone(&underscored)) {
            return Ok(tz);
        }
    }

    Err(RosterError::UnknownTimezone(raw.to_string()))
}

fn alias_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace('-', "_")
        .to_ascii_uppercase()
}

fn title_case_zone(name: &str) -> String {
    name.split('/')
        .map(|segment| {
            segment
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_ascii_uppercase().to_string()
                                + &chars.as_str().to_ascii_lowercase()
                        }
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join("_")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve a raw timezone string, falling back to `reference`.
pub fn resolve_zone(raw: &str, reference: Tz) -> ZoneResolution {
    match normalize_alias(raw) {
        Ok(tz) => ZoneResolution { tz, warning: None },
        Err(err) => {
            warn!(%err, reference = reference.name(), "falling back to reference timezone");
            ZoneResolution {
                tz: reference,
                warning: Some(format!("{}; using {}", err, reference.name())),
            }
        }
    }
}

/// UTC offset of `tz` in minutes on `date`, with that date's DST state.
///
/// The offset is sampled at 12:00 UTC so the result does not depend on a
/// transition hour.
pub fn offset_minutes(tz: Tz, date: NaiveDate) -> i32 {
    let noon = date.and_time(chrono::NaiveTime::default()) + Duration::hours(12);
    tz.offset_from_utc_datetime(&noon).fix().local_minus_utc() / 60
}

/// Convert a local datetime in `tz` to UTC.
///
/// Ambiguous times (fall back) use the earlier occurrence. Nonexistent
/// times (spring forward) are read with the offset in force before the gap,
/// which lands them the length of the gap later on the wall clock.
pub fn local_to_utc(local: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let day_before = local.checked_sub_signed(Duration::days(1))?;
            let offset = tz.offset_from_utc_datetime(&day_before).fix();
            let utc = local.checked_sub_signed(Duration::seconds(i64::from(
                offset.local_minus_utc(),
            )))?;
            Some(Utc.from_utc_datetime(&utc))
        }
    }
}

fn local_datetime(date: NaiveDate, minutes: u32) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::minutes(i64::from(minutes)))
}

/// Exact conversion of local `minutes` on `date` in `tz` into `reference`.
pub fn convert_exact(
    minutes: u32,
    tz: Tz,
    date: NaiveDate,
    reference: Tz,
) -> Result<ConvertedTime> {
    if minutes >= MINUTES_PER_DAY {
        return Err(RosterError::ConversionFailure(format!(
            "{} minutes is outside a day",
            minutes
        )));
    }

    let local = local_datetime(date, minutes).ok_or_else(|| {
        RosterError::ConversionFailure(format!("cannot build local time on {}", date))
    })?;

    let utc = local_to_utc(local, tz).ok_or_else(|| {
        RosterError::ConversionFailure(format!("cannot resolve {} in {}", local, tz.name()))
    })?;
    let converted = utc.with_timezone(&reference);

    Ok(ConvertedTime {
        minutes: converted.hour() * 60 + converted.minute(),
        date: converted.date_naive(),
        instant: utc,
        method: ConversionMethod::Exact,
    })
}

/// Approximate UTC offset from the fixed seasonal profile table.
pub fn seasonal_offset_minutes(tz: Tz, date: NaiveDate) -> Result<i32> {
    let (_, standard, daylight, rule) = SEASONAL_PROFILES
        .iter()
        .find(|(name, ..)| *name == tz.name())
        .ok_or_else(|| {
            RosterError::ConversionFailure(format!("no seasonal profile for {}", tz.name()))
        })?;

    if in_dst_season(*rule, date) {
        Ok(*daylight)
    } else {
        Ok(*standard)
    }
}

fn in_dst_season(rule: DstRule, date: NaiveDate) -> bool {
    let year = date.year();
    let sunday =
        |month: u32, n: u8| NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, n);
    let last_sunday = |month: u32| sunday(month, 5).or_else(|| sunday(month, 4));

    match rule {
        DstRule::None => false,
        DstRule::NorthAmerica => match (sunday(3, 2), sunday(11, 1)) {
            (Some(start), Some(end)) => date >= start && date < end,
            _ => false,
        },
        DstRule::Europe => match (last_sunday(3), last_sunday(10)) {
            (Some(start), Some(end)) => date >= start && date < end,
            _ => false,
        },
        DstRule::Australia => match (sunday(10, 1), sunday(4, 1)) {
            (Some(start), Some(end)) => date >= start || date < end,
            _ => false,
        },
    }
}

/// Conversion using the seasonal profile table for both zones.
pub fn convert_seasonal(
    minutes: u32,
    tz: Tz,
    date: NaiveDate,
    reference: Tz,
) -> Result<ConvertedTime> {
    let source_offset = seasonal_offset_minutes(tz, date)?;
    let reference_offset = seasonal_offset_minutes(reference, date)?;

    let overflow = || RosterError::ConversionFailure(format!("date overflow from {}", date));
    let utc = local_datetime(date, minutes)
        .and_then(|local| local.checked_sub_signed(Duration::minutes(i64::from(source_offset))))
        .ok_or_else(overflow)?;

    let shifted = i64::from(minutes) - i64::from(source_offset) + i64::from(reference_offset);
    let day_shift = shifted.div_euclid(i64::from(MINUTES_PER_DAY));
    let date = date
        .checked_add_signed(Duration::days(day_shift))
        .ok_or_else(overflow)?;

    Ok(ConvertedTime {
        minutes: shifted.rem_euclid(i64::from(MINUTES_PER_DAY)) as u32,
        date,
        instant: Utc.from_utc_datetime(&utc),
        method: ConversionMethod::Seasonal,
    })
}

/// Convert local `minutes` on `date` in `tz` into the reference zone.
///
/// Never fails: exact conversion, then the seasonal approximation, then
/// the identity mapping. Each downgrade is logged and visible through
/// [`ConvertedTime::method`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use rosterbucket_core::tz::{convert_to_reference, parse_tz};
///
/// let kolkata = parse_tz("Asia/Kolkata").unwrap();
/// let sydney = parse_tz("Australia/Sydney").unwrap();
/// let date = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
///
/// // 11:30 PM in Kolkata is 5:00 AM the next day in Sydney (AEDT).
/// let converted = convert_to_reference(23 * 60 + 30, kolkata, date, sydney);
/// assert_eq!(converted.minutes, 300);
/// assert_eq!(converted.date, NaiveDate::from_ymd_opt(2024, 11, 16).unwrap());
/// ```
pub fn convert_to_reference(
    minutes: u32,
    tz: Tz,
    date: NaiveDate,
    reference: Tz,
) -> ConvertedTime {
    let exact_err = match convert_exact(minutes, tz, date, reference) {
        Ok(converted) => return converted,
        Err(err) => err,
    };
    warn!(
        err = %exact_err,
        zone = tz.name(),
        %date,
        "exact conversion failed, trying seasonal offsets"
    );

    match convert_seasonal(minutes, tz, date, reference) {
        Ok(converted) => converted,
        Err(err) => {
            warn!(%err, zone = tz.name(), %date, "seasonal conversion failed, keeping local time");
            let minutes = minutes.min(MINUTES_PER_DAY - 1);
            // Without offsets the local wall clock is the only timeline left.
            let local = local_datetime(date, minutes)
                .unwrap_or_else(|| date.and_time(chrono::NaiveTime::default()));
            ConvertedTime {
                minutes,
                date,
                instant: Utc.from_utc_datetime(&local),
                method: ConversionMethod::Identity,
            }
        }
    }
}
