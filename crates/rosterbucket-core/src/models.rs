//! Core data types for rosterbucket.
//!
//! This module defines the primary types used throughout the library:
//! - [`ScheduleEntry`] - One input schedule row, validated at the boundary
//! - [`ParsedTime`] - Clock minutes plus a day offset
//! - [`TimeBucket`] - One of the 48 fixed half-hour slots of a day
//! - [`EntryRecord`] - Per-entry audit record produced by an aggregation run
//! - [`Report`] - Complete result of an aggregation run

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::parse::minutes_to_time_string;

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: u32 = 1440;

/// Width of one bucket in minutes.
pub const BUCKET_MINUTES: u32 = 30;

/// Number of buckets partitioning one day.
pub const BUCKETS_PER_DAY: usize = (MINUTES_PER_DAY / BUCKET_MINUTES) as usize;

/// One schedule row as handed over by the tabular-parsing layer.
///
/// Rows missing any required field fail deserialization, so everything
/// reaching the engine has all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub site: String,
    /// Raw timezone string (abbreviation, alias or IANA id).
    pub timezone: String,
    pub team: String,
    pub agent: String,
    /// Source calendar date, `MM/DD/YYYY`.
    pub date: String,
    /// Free-text state label.
    pub schedule_state: String,
    pub start_time: String,
    pub end_time: String,
    /// Authoritative duration, `H+:MM[:SS]`.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub paid_hours: Option<String>,
}

/// A parsed clock time with an optional day offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTime {
    /// Minutes after local midnight, `None` when nothing parsable was found.
    pub minutes: Option<u32>,
    /// Whole days to add to the source date.
    pub day_offset: u32,
}

/// A fixed 30-minute slot of a reference day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub index: usize,
    pub start_minutes: u32,
    pub end_minutes: u32,
    /// Display label, e.g. `9:00 AM - 9:30 AM`.
    pub label: String,
}

impl TimeBucket {
    /// Build the bucket at `index` (0..48).
    pub fn at(index: usize) -> Self {
        let start_minutes = index as u32 * BUCKET_MINUTES;
        let end_minutes = start_minutes + BUCKET_MINUTES;
        Self {
            index,
            start_minutes,
            end_minutes,
            label: format!(
                "{} - {}",
                minutes_to_time_string(start_minutes),
                minutes_to_time_string(end_minutes)
            ),
        }
    }

    /// All buckets of one day, in order. They partition `[0, 1440)`.
    pub fn day() -> Vec<Self> {
        (0..BUCKETS_PER_DAY).map(Self::at).collect()
    }
}

/// How a local time was carried into the reference zone.
///
/// Ordered from most to least precise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMethod {
    /// Exact IANA conversion with the DST state of that date.
    #[default]
    Exact,
    /// Fixed seasonal-offset approximation.
    Seasonal,
    /// No conversion; the local time was taken as-is.
    Identity,
}

impl std::fmt::Display for ConversionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionMethod::Exact => write!(f, "exact"),
            ConversionMethod::Seasonal => write!(f, "seasonal"),
            ConversionMethod::Identity => write!(f, "identity"),
        }
    }
}

/// Minutes one entry contributed to one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketAllocation {
    pub index: usize,
    pub minutes: f64,
}

/// Audit record for one entry that made it into the totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub agent: String,
    pub site: String,
    pub team: String,
    pub raw_state: String,
    /// Canonical state the entry was attributed to.
    pub state: String,
    /// Reference-zone date of the converted start, `MM/DD/YYYY`.
    pub date: String,
    pub reference_start: String,
    pub reference_end: String,
    pub source_duration_minutes: i64,
    pub reference_span_minutes: i64,
    /// `reference_span_minutes - source_duration_minutes`; diagnostic only.
    pub duration_difference: i64,
    /// Minutes added to the state total.
    pub allocated_minutes: f64,
    /// Non-zero bucket allocations.
    pub buckets: Vec<BucketAllocation>,
    pub was_clamped: bool,
    pub was_timezone_converted: bool,
    pub day_offset_applied: bool,
    pub conversion_method: ConversionMethod,
}

/// Totals for one canonical state inside one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalStateTotals {
    pub total_duration: f64,
    pub agent_count: usize,
    pub agents: BTreeSet<String>,
}

/// One bucket and its per-state totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalSummary {
    pub interval: TimeBucket,
    pub states: BTreeMap<String, IntervalStateTotals>,
}

/// Totals for one canonical state over the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTotals {
    pub total_duration: f64,
    pub total_agents: usize,
    pub total_count: usize,
    #[serde(skip)]
    pub agents: BTreeSet<String>,
}

/// Earliest and latest reference dates seen, `MM/DD/YYYY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Run-level counters. Degradations show up here and nowhere else.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub total_entries: usize,
    pub processed_entries: usize,
    pub skipped_entries: usize,
    /// Dropped by the day-off exclusion.
    pub excluded_entries: usize,
    /// Converted span does not touch the target date.
    pub out_of_range_entries: usize,
    pub unparsable_times: usize,
    pub unknown_timezones: usize,
    pub invalid_dates: usize,
    pub conversion_fallbacks: usize,
    pub unique_agents: usize,
    pub unique_states: usize,
    pub date_range: Option<DateRange>,
    pub reference_timezone: String,
    pub target_date: Option<String>,
}

/// Complete result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub intervals: Vec<IntervalSummary>,
    pub state_totals: BTreeMap<String, StateTotals>,
    pub processed_entries: Vec<EntryRecord>,
    pub metadata: ReportMetadata,
}
