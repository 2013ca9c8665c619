//! # rosterbucket-core
//!
//! Workforce schedule aggregation into half-hour buckets of a reference
//! timezone.
//!
//! Schedule rows arrive with free-text state labels, loosely formatted
//! clock times and local timezones. This library normalizes all of that and
//! produces per-bucket and per-state totals.
//!
//! ## Features
//!
//! - **Forgiving parsing**: `4:00 PM`, `400 PM`, `16:00`, plus day-offset
//!   notations such as `+12:45 AM` or `02:00 AM +2`.
//! - **DST-aware conversion**: exact IANA conversion with a seasonal-offset
//!   fallback, so a late-evening shift in Kolkata lands on the right
//!   Sydney day.
//! - **State matching**: exact, token-subset and Jaccard matching against a
//!   configurable catalog, with exception phrases.
//! - **Duration-faithful allocation**: the authoritative row duration is
//!   spread over the converted span's buckets.
//! - **Day-off exclusion**: a full-day absence suppresses the agent's other
//!   entries on that date.
//!
//! ## Example
//!
//! ```rust
//! use rosterbucket_core::prelude::*;
//!
//! let entries: Vec<ScheduleEntry> = serde_json::from_str(r#"[{
//!     "site": "BLR", "timezone": "IST", "team": "Blue", "agent": "a1",
//!     "date": "11/15/2024", "scheduleState": "Break- 15 minutes",
//!     "startTime": "11:30 PM", "endTime": "11:45 PM", "duration": "0:15"
//! }]"#).unwrap();
//!
//! let catalog = StateCatalog::builtin();
//! let sydney = parse_tz("Australia/Sydney").unwrap();
//! let target = parse_schedule_date("11/16/2024").unwrap();
//!
//! let report = process_schedule_data(&entries, &catalog, sydney, Some(target));
//! assert_eq!(report.state_totals["Break"].total_duration, 15.0);
//! assert!(report.intervals[10].states.contains_key("Break"));
//! ```

pub mod aggregate;
pub mod allocate;
pub mod catalog;
pub mod compare;
pub mod error;
pub mod exclusion;
pub mod matcher;
pub mod models;
pub mod parse;
pub mod tz;

// Re-export commonly used types at the crate root
pub use aggregate::{
    ScheduleAggregator, filter_by_canonical_states, filter_by_group, process_schedule_data,
};
pub use catalog::{CanonicalState, StateCatalog};
pub use compare::{Comparison, compare_reports};
pub use error::{Result, RosterError};
pub use matcher::StateMatcher;
pub use models::{
    ConversionMethod, EntryRecord, IntervalSummary, Report, ReportMetadata, ScheduleEntry,
    StateTotals, TimeBucket,
};
pub use parse::{parse_clock_time, parse_clock_time_with_day_offset, parse_duration_minutes};

/// Prelude module for convenient imports.
///
/// ```
/// use rosterbucket_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aggregate::{
        ScheduleAggregator, filter_by_canonical_states, filter_by_group, process_schedule_data,
    };
    pub use crate::catalog::{CanonicalState, StateCatalog};
    pub use crate::compare::{Comparison, compare_reports};
    pub use crate::error::{Result, RosterError};
    pub use crate::models::*;
    pub use crate::parse::{
        format_duration, minutes_to_time_string, parse_clock_time,
        parse_clock_time_with_day_offset, parse_duration_minutes, parse_schedule_date,
    };
    pub use crate::tz::{convert_to_reference, normalize_alias, parse_tz};
}
