//! Schedule aggregation.
//!
//! One run takes an immutable entry list and catalog snapshot and produces
//! a [`Report`]: 48 half-hour buckets with per-state minutes and agents,
//! per-state totals, an audit record per contributing entry, and run
//! metadata. No row ever aborts the run; degraded rows are counted in the
//! metadata instead.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::allocate::{ReferenceSpan, SourceSpan, allocate, convert_span, overlaps_date};
use crate::catalog::StateCatalog;
use crate::error::RosterError;
use crate::exclusion::{DayOffSubject, apply_exclusion, excluded_agent_days};
use crate::matcher::StateMatcher;
use crate::models::{
    ConversionMethod, DateRange, EntryRecord, IntervalSummary, MINUTES_PER_DAY, Report,
    ReportMetadata, ScheduleEntry, StateTotals, TimeBucket,
};
use crate::parse::{
    format_schedule_date, is_full_day, minutes_to_time_string, parse_clock_time_with_day_offset,
    parse_schedule_date,
};
use crate::tz::{ConvertedTime, resolve_zone};

/// Aggregation engine bound to one catalog snapshot and reference zone.
#[derive(Debug)]
pub struct ScheduleAggregator<'a> {
    catalog: &'a StateCatalog,
    matcher: StateMatcher<'a>,
    reference: Tz,
    fallback_date: Option<NaiveDate>,
}

/// One entry after state resolution, parsing and conversion.
struct PreparedEntry<'e> {
    entry: &'e ScheduleEntry,
    state: String,
    time_off: bool,
    full_day: bool,
    source_date: NaiveDate,
    zone: Tz,
    source: Option<SourceSpan>,
    converted: Option<ReferenceSpan>,
}

impl DayOffSubject for PreparedEntry<'_> {
    fn agent(&self) -> &str {
        &self.entry.agent
    }

    fn source_date(&self) -> NaiveDate {
        self.source_date
    }

    fn is_time_off(&self) -> bool {
        self.time_off
    }

    fn is_full_day(&self) -> bool {
        self.full_day
    }

    fn reference_date(&self) -> Option<NaiveDate> {
        self.converted.map(|span| span.start.date)
    }

    fn touches(&self, date: NaiveDate) -> bool {
        self.converted.is_some_and(|span| overlaps_date(&span, date))
    }
}

impl<'a> ScheduleAggregator<'a> {
    pub fn new(catalog: &'a StateCatalog, reference: Tz) -> Self {
        Self {
            catalog,
            matcher: StateMatcher::new(catalog),
            reference,
            fallback_date: None,
        }
    }

    /// Date substituted for unparsable row dates. Defaults to today in the
    /// reference zone, captured once per run.
    pub fn with_fallback_date(mut self, date: NaiveDate) -> Self {
        self.fallback_date = Some(date);
        self
    }

    pub fn reference(&self) -> Tz {
        self.reference
    }

    /// Aggregate `entries`, optionally restricted to the reference-zone
    /// calendar date `target`.
    pub fn process_schedule_data(
        &self,
        entries: &[ScheduleEntry],
        target: Option<NaiveDate>,
    ) -> Report {
        let fallback_date = self
            .fallback_date
            .unwrap_or_else(|| Utc::now().with_timezone(&self.reference).date_naive());

        let mut metadata = ReportMetadata {
            total_entries: entries.len(),
            reference_timezone: self.reference.name().to_string(),
            target_date: target.map(format_schedule_date),
            ..ReportMetadata::default()
        };

        let mut labels: HashMap<&str, String> = HashMap::new();
        let prepared: Vec<PreparedEntry<'_>> = entries
            .iter()
            .map(|entry| {
                let state = labels
                    .entry(entry.schedule_state.as_str())
                    .or_insert_with(|| self.matcher.match_label(&entry.schedule_state))
                    .clone();
                self.prepare(entry, state, fallback_date, &mut metadata)
            })
            .collect();

        let excluded = excluded_agent_days(&prepared, target);
        let (survivors, dropped) = apply_exclusion(prepared, &excluded, target);
        metadata.excluded_entries = dropped;

        let mut intervals: Vec<IntervalSummary> = TimeBucket::day()
            .into_iter()
            .map(|interval| IntervalSummary {
                interval,
                states: BTreeMap::new(),
            })
            .collect();
        let mut state_totals: BTreeMap<String, StateTotals> = BTreeMap::new();
        let mut records = Vec::new();
        let mut agents = BTreeSet::new();
        let mut dates = BTreeSet::new();

        for prepared in survivors {
            let (Some(source), Some(span)) = (prepared.source, prepared.converted) else {
                continue;
            };
            let entry = prepared.entry;

            let Some(allocation) = allocate(&span, entry.duration.as_deref(), target) else {
                debug!(agent = %entry.agent, state = %prepared.state, "entry outside target date");
                metadata.out_of_range_entries += 1;
                continue;
            };

            for bucket in &allocation.buckets {
                let totals = intervals[bucket.index]
                    .states
                    .entry(prepared.state.clone())
                    .or_default();
                totals.total_duration += bucket.minutes;
                totals.agents.insert(entry.agent.clone());
            }

            let totals = state_totals.entry(prepared.state.clone()).or_default();
            totals.total_duration += allocation.state_minutes;
            totals.total_count += 1;
            totals.agents.insert(entry.agent.clone());

            agents.insert(entry.agent.clone());
            dates.insert(span.start.date);

            records.push(EntryRecord {
                agent: entry.agent.clone(),
                site: entry.site.clone(),
                team: entry.team.clone(),
                raw_state: entry.schedule_state.clone(),
                state: prepared.state,
                date: format_schedule_date(span.start.date),
                reference_start: minutes_to_time_string(span.start.minutes),
                reference_end: minutes_to_time_string(span.end.minutes),
                source_duration_minutes: allocation.source_duration_minutes,
                reference_span_minutes: allocation.reference_span_minutes,
                duration_difference: allocation.duration_difference(),
                allocated_minutes: allocation.state_minutes,
                buckets: allocation.buckets,
                was_clamped: allocation.was_clamped,
                was_timezone_converted: prepared.zone != self.reference,
                day_offset_applied: source.start_day_offset > 0 || source.end_day_offset > 0,
                conversion_method: span.start.method.max(span.end.method),
            });
        }

        for interval in &mut intervals {
            for totals in interval.states.values_mut() {
                totals.agent_count = totals.agents.len();
            }
        }
        for totals in state_totals.values_mut() {
            totals.total_agents = totals.agents.len();
        }

        metadata.processed_entries = records.len();
        metadata.skipped_entries = metadata.total_entries - records.len();
        metadata.unique_agents = agents.len();
        metadata.unique_states = state_totals.len();
        metadata.date_range = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => Some(DateRange {
                start: format_schedule_date(*first),
                end: format_schedule_date(*last),
            }),
            _ => None,
        };

        debug!(
            total = metadata.total_entries,
            processed = metadata.processed_entries,
            excluded = metadata.excluded_entries,
            out_of_range = metadata.out_of_range_entries,
            unparsable = metadata.unparsable_times,
            "aggregation finished"
        );

        Report {
            intervals,
            state_totals,
            processed_entries: records,
            metadata,
        }
    }

    fn prepare<'e>(
        &self,
        entry: &'e ScheduleEntry,
        state: String,
        fallback_date: NaiveDate,
        metadata: &mut ReportMetadata,
    ) -> PreparedEntry<'e> {
        let time_off = self.catalog.is_time_off(&state);
        let full_day = is_full_day(&entry.start_time) || is_full_day(&entry.end_time);

        let source_date = match parse_schedule_date(&entry.date) {
            Ok(date) => date,
            Err(err) => {
                warn!(%err, agent = %entry.agent, fallback = %fallback_date, "using fallback date");
                metadata.invalid_dates += 1;
                fallback_date
            }
        };

        let resolution = resolve_zone(&entry.timezone, self.reference);
        if resolution.warning.is_some() {
            metadata.unknown_timezones += 1;
        }
        let zone = resolution.tz;

        let source = if full_day {
            Some(SourceSpan {
                date: source_date,
                zone,
                start_minutes: 0,
                start_day_offset: 0,
                end_minutes: MINUTES_PER_DAY - 1,
                end_day_offset: 0,
            })
        } else {
            let start = parse_clock_time_with_day_offset(&entry.start_time);
            let end = parse_clock_time_with_day_offset(&entry.end_time);
            match (start.minutes, end.minutes) {
                (Some(start_minutes), Some(end_minutes)) => Some(SourceSpan {
                    date: source_date,
                    zone,
                    start_minutes,
                    start_day_offset: start.day_offset,
                    end_minutes,
                    end_day_offset: end.day_offset,
                }),
                _ => {
                    let err = RosterError::UnparsableTime(format!(
                        "'{}' - '{}'",
                        entry.start_time, entry.end_time
                    ));
                    warn!(%err, agent = %entry.agent, "dropping entry from allocation");
                    metadata.unparsable_times += 1;
                    None
                }
            }
        };

        let converted = source.map(|span| convert_span(&span, self.reference));
        let inexact = |time: &ConvertedTime| time.method != ConversionMethod::Exact;
        if converted.is_some_and(|span| inexact(&span.start) || inexact(&span.end)) {
            metadata.conversion_fallbacks += 1;
        }

        PreparedEntry {
            entry,
            state,
            time_off,
            full_day,
            source_date,
            zone,
            source,
            converted,
        }
    }
}

/// Aggregate `entries` with a one-off aggregator.
pub fn process_schedule_data(
    entries: &[ScheduleEntry],
    catalog: &StateCatalog,
    reference: Tz,
    target: Option<NaiveDate>,
) -> Report {
    ScheduleAggregator::new(catalog, reference).process_schedule_data(entries, target)
}

/// Project `report` onto the states named in `allowed`.
///
/// Nothing is recomputed: bucket and state entries outside the set are
/// dropped, as are audit records attributed to them.
pub fn filter_by_canonical_states<S: AsRef<str>>(report: &Report, allowed: &[S]) -> Report {
    let allowed: HashSet<&str> = allowed.iter().map(|s| s.as_ref()).collect();

    let intervals = report
        .intervals
        .iter()
        .map(|summary| IntervalSummary {
            interval: summary.interval.clone(),
            states: summary
                .states
                .iter()
                .filter(|(name, _)| allowed.contains(name.as_str()))
                .map(|(name, totals)| (name.clone(), totals.clone()))
                .collect(),
        })
        .collect();

    let state_totals: BTreeMap<String, StateTotals> = report
        .state_totals
        .iter()
        .filter(|(name, _)| allowed.contains(name.as_str()))
        .map(|(name, totals)| (name.clone(), totals.clone()))
        .collect();

    let processed_entries = report
        .processed_entries
        .iter()
        .filter(|record| allowed.contains(record.state.as_str()))
        .cloned()
        .collect();

    let metadata = ReportMetadata {
        unique_states: state_totals.len(),
        ..report.metadata.clone()
    };

    Report {
        intervals,
        state_totals,
        processed_entries,
        metadata,
    }
}

/// Project `report` onto the states of one catalog group.
pub fn filter_by_group(report: &Report, catalog: &StateCatalog, group: &str) -> Report {
    filter_by_canonical_states(report, &catalog.states_in_group(group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tz::parse_tz;

    fn sydney() -> Tz {
        parse_tz("Australia/Sydney").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(
        agent: &str,
        tz: &str,
        day: &str,
        state: &str,
        start: &str,
        end: &str,
    ) -> ScheduleEntry {
        ScheduleEntry {
            site: "SYD".to_string(),
            timezone: tz.to_string(),
            team: "Blue".to_string(),
            agent: agent.to_string(),
            date: day.to_string(),
            schedule_state: state.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            duration: None,
            paid_hours: None,
        }
    }

    fn with_duration(mut entry: ScheduleEntry, duration: &str) -> ScheduleEntry {
        entry.duration = Some(duration.to_string());
        entry
    }

    fn run(entries: &[ScheduleEntry], target: Option<NaiveDate>) -> Report {
        let catalog = StateCatalog::builtin();
        ScheduleAggregator::new(&catalog, sydney())
            .with_fallback_date(date(2024, 11, 1))
            .process_schedule_data(entries, target)
    }

    #[test]
    fn same_day_duration_is_attributed_unscaled() {
        let entries = vec![with_duration(
            entry("a1", "Australia/Sydney", "11/15/2024", "Meeting", "9:00 AM", "11:30 AM"),
            "2:30",
        )];
        let report = run(&entries, Some(date(2024, 11, 15)));

        assert_eq!(report.state_totals["Meeting"].total_duration, 150.0);
        assert_eq!(report.state_totals["Meeting"].total_agents, 1);
        let record = &report.processed_entries[0];
        assert!(!record.was_clamped);
        assert!(!record.was_timezone_converted);
        assert_eq!(record.duration_difference, 0);
        assert_eq!(record.buckets.len(), 5);
        assert_eq!(record.buckets[0].index, 18);
    }

    #[test]
    fn kolkata_late_evening_lands_on_next_reference_day() {
        let entries = vec![with_duration(
            entry("a1", "Asia/Kolkata", "11/15/2024", "Break", "11:30 PM", "11:45 PM"),
            "0:15",
        )];

        let on_16th = run(&entries, Some(date(2024, 11, 16)));
        assert_eq!(on_16th.processed_entries.len(), 1);
        let record = &on_16th.processed_entries[0];
        assert_eq!(record.date, "11/16/2024");
        assert_eq!(record.reference_start, "5:00 AM");
        assert!(record.was_timezone_converted);
        let bucket = &on_16th.intervals[10].states["Break"];
        assert_eq!(bucket.total_duration, 15.0);
        assert_eq!(bucket.agent_count, 1);

        let on_15th = run(&entries, Some(date(2024, 11, 15)));
        assert!(on_15th.processed_entries.is_empty());
        assert_eq!(on_15th.metadata.out_of_range_entries, 1);
    }

    #[test]
    fn full_day_off_excludes_that_day_only() {
        let entries = vec![
            entry("x", "Australia/Sydney", "11/15/2024", "Day Off", "Full Day", "Full Day"),
            entry("x", "Australia/Sydney", "11/15/2024", "Break", "10:00 AM", "10:15 AM"),
            entry("x", "Australia/Sydney", "11/16/2024", "Break", "10:00 AM", "10:15 AM"),
            entry("y", "Australia/Sydney", "11/15/2024", "Break", "10:00 AM", "10:15 AM"),
        ];

        let report = run(&entries, Some(date(2024, 11, 15)));
        assert_eq!(report.metadata.excluded_entries, 1);
        assert!(report.state_totals.contains_key("Day Off"));
        assert_eq!(report.state_totals["Break"].total_agents, 1);
        assert!(report.state_totals["Break"].agents.contains("y"));

        let unfiltered = run(&entries, None);
        let x_breaks: Vec<_> = unfiltered
            .processed_entries
            .iter()
            .filter(|r| r.agent == "x" && r.state == "Break")
            .collect();
        assert_eq!(x_breaks.len(), 1);
        assert_eq!(x_breaks[0].date, "11/16/2024");
    }

    #[test]
    fn day_off_reaches_entries_converted_from_the_previous_day() {
        // 10:00 PM on 11/14 in Manila is 1:00 AM on 11/15 in Sydney.
        let entries = vec![
            entry("m1", "Asia/Manila", "11/15/2024", "Day Off", "Full Day", "Full Day"),
            entry("m1", "Asia/Manila", "11/14/2024", "Break", "10:00 PM", "10:30 PM"),
            entry("m1", "Asia/Manila", "11/14/2024", "Break", "9:00 AM", "9:30 AM"),
        ];

        let report = run(&entries, Some(date(2024, 11, 15)));
        assert_eq!(report.metadata.excluded_entries, 1);
        assert!(!report.state_totals.contains_key("Break"));
        assert!(report.state_totals.contains_key("Day Off"));
        assert_eq!(report.metadata.out_of_range_entries, 1);

        // Unfiltered, the day is the source date and the 11/14 break stays.
        let unfiltered = run(&entries, None);
        assert_eq!(unfiltered.metadata.excluded_entries, 0);
        assert_eq!(unfiltered.state_totals["Break"].total_count, 2);
    }

    #[test]
    fn degradations_are_counted_not_raised() {
        let entries = vec![
            entry("a1", "Mars/Olympus", "11/15/2024", "Break", "10:00 AM", "10:15 AM"),
            entry("a2", "AEST", "not a date", "Break", "10:00 AM", "10:15 AM"),
            entry("a3", "AEST", "11/15/2024", "Break", "soon", "later"),
        ];
        let report = run(&entries, None);

        assert_eq!(report.metadata.total_entries, 3);
        assert_eq!(report.metadata.unknown_timezones, 1);
        assert_eq!(report.metadata.invalid_dates, 1);
        assert_eq!(report.metadata.unparsable_times, 1);
        assert_eq!(report.metadata.processed_entries, 2);
        assert_eq!(report.metadata.skipped_entries, 1);

        let fallback = report
            .processed_entries
            .iter()
            .find(|r| r.agent == "a2")
            .unwrap();
        assert_eq!(fallback.date, "11/01/2024");
    }

    #[test]
    fn unmatched_labels_stay_visible() {
        let entries = vec![entry(
            "a1",
            "Australia/Sydney",
            "11/15/2024",
            "Break - Healthy Living",
            "10:00 AM",
            "10:30 AM",
        )];
        let report = run(&entries, None);
        assert!(report.state_totals.contains_key("Break - Healthy Living"));
        assert_eq!(report.metadata.unique_states, 1);
    }

    #[test]
    fn processing_is_idempotent() {
        let entries = vec![
            with_duration(
                entry("a1", "EST", "11/15/2024", "Break- 10 minutes", "9:00 AM", "9:10 AM"),
                "0:10",
            ),
            entry("a2", "IST", "11/15/2024", "Lunch", "11:30 PM", "+12:30 AM"),
        ];
        assert_eq!(run(&entries, None), run(&entries, None));
    }

    #[test]
    fn day_offset_flag_and_metadata() {
        let entries = vec![entry(
            "a1",
            "Australia/Sydney",
            "11/15/2024",
            "Training",
            "11:00 PM",
            "+1:00 AM",
        )];
        let report = run(&entries, None);
        let record = &report.processed_entries[0];
        assert!(record.day_offset_applied);
        assert_eq!(record.reference_span_minutes, 120);
        assert_eq!(report.metadata.reference_timezone, "Australia/Sydney");
        assert_eq!(
            report.metadata.date_range,
            Some(DateRange {
                start: "11/15/2024".to_string(),
                end: "11/15/2024".to_string(),
            })
        );
    }

    #[test]
    fn filters_are_pure_projections() {
        let entries = vec![
            entry("a1", "Australia/Sydney", "11/15/2024", "Break", "10:00 AM", "10:15 AM"),
            entry("a2", "Australia/Sydney", "11/15/2024", "Available", "10:00 AM", "11:00 AM"),
        ];
        let catalog = StateCatalog::builtin();
        let report = run(&entries, None);

        let shrinkage = filter_by_group(&report, &catalog, "Shrinkage");
        assert_eq!(shrinkage.state_totals.keys().collect::<Vec<_>>(), vec!["Break"]);
        assert!(shrinkage.intervals[20].states.contains_key("Break"));
        assert!(!shrinkage.intervals[20].states.contains_key("Available"));
        assert_eq!(shrinkage.processed_entries.len(), 1);
        assert_eq!(shrinkage.metadata.unique_states, 1);
        assert_eq!(shrinkage.metadata.total_entries, 2);

        let untouched = filter_by_canonical_states(&report, &["Break", "Available"]);
        assert_eq!(untouched, report);
    }
}
