//! Day-off exclusion.
//!
//! An agent with a full-day time-off record on a day should not also
//! accumulate break or meeting minutes on that day. The filter runs in two
//! passes over the whole entry set of one run:
//!
//! 1. Collect the excluded agent-days from every full-day time-off entry.
//!    With a target date the day is the target itself, and only time-off
//!    entries converting onto the target count. Without one it is the
//!    entry's source date.
//! 2. Drop every other entry of those agent-days, keeping the time-off
//!    entries themselves. With a target date an entry belongs to the day
//!    when its converted span touches the target, whatever its source date.

use std::collections::HashSet;

use chrono::NaiveDate;

/// What the exclusion filter needs to know about one entry.
pub trait DayOffSubject {
    fn agent(&self) -> &str;

    /// Calendar date of the row in its source zone.
    fn source_date(&self) -> NaiveDate;

    /// Whether the resolved canonical state is in the day-off family.
    fn is_time_off(&self) -> bool;

    /// Whether the start or end column holds the full-day sentinel.
    fn is_full_day(&self) -> bool;

    /// Reference-zone date of the converted start, if it converted.
    fn reference_date(&self) -> Option<NaiveDate>;

    /// Whether the converted span reaches into the reference-zone `date`.
    fn touches(&self, date: NaiveDate) -> bool;
}

/// Agent-days fully covered by a time-off record.
pub type ExcludedDays = HashSet<(String, NaiveDate)>;

/// First pass: find the agent-days to exclude.
pub fn excluded_agent_days<T: DayOffSubject>(
    entries: &[T],
    target: Option<NaiveDate>,
) -> ExcludedDays {
    entries
        .iter()
        .filter(|e| e.is_time_off() && e.is_full_day())
        .filter_map(|e| match target {
            Some(target) => (e.reference_date() == Some(target))
                .then(|| (e.agent().to_string(), target)),
            None => Some((e.agent().to_string(), e.source_date())),
        })
        .collect()
}

/// Second pass: drop entries of excluded agent-days unless they are
/// time-off entries themselves. Returns the survivors and the drop count.
///
/// `target` must be the one the days were collected with.
pub fn apply_exclusion<T: DayOffSubject>(
    entries: Vec<T>,
    excluded: &ExcludedDays,
    target: Option<NaiveDate>,
) -> (Vec<T>, usize) {
    if excluded.is_empty() {
        return (entries, 0);
    }

    let before = entries.len();
    let kept: Vec<T> = entries
        .into_iter()
        .filter(|e| e.is_time_off() || !falls_on_excluded_day(e, excluded, target))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

fn falls_on_excluded_day<T: DayOffSubject>(
    entry: &T,
    excluded: &ExcludedDays,
    target: Option<NaiveDate>,
) -> bool {
    match target {
        Some(target) => {
            entry.touches(target) && excluded.contains(&(entry.agent().to_string(), target))
        }
        None => excluded.contains(&(entry.agent().to_string(), entry.source_date())),
    }
}
