use std::fs::File;
use std::io::{self, BufReader, Read};

use chrono::NaiveDate;
use chrono_tz::Tz;
use rosterbucket_core::parse::{format_duration, parse_schedule_date};
use rosterbucket_core::{Report, ScheduleEntry, StateCatalog, filter_by_canonical_states};
use serde::Serialize;
use tracing::debug;

use crate::cli::SettingsArgs;
use crate::error::{CliError, CliResult};
use crate::settings::Settings;

/// Catalog snapshot and reference zone for one invocation.
pub struct RunContext {
    pub catalog: StateCatalog,
    pub reference: Tz,
}

pub fn load_context(args: &SettingsArgs) -> CliResult<RunContext> {
    let settings = Settings::load_from(args.config.as_deref())
        .map_err(|e| CliError::input(format!("{:#}", e)))?;
    let reference = settings
        .reference(args.reference_tz.as_deref())
        .map_err(|e| CliError::input(format!("{:#}", e)))?;

    Ok(RunContext {
        catalog: settings.catalog,
        reference,
    })
}

/// Read a JSON array of schedule rows from a file, or stdin for `-`.
pub fn read_entries(input: &str) -> CliResult<Vec<ScheduleEntry>> {
    let mut reader: Box<dyn Read> = if input == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(input).map_err(|e| {
            CliError::runtime(format!("Failed to open file: {}", e)).in_export(input)
        })?;
        Box::new(BufReader::new(file))
    };

    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|e| CliError::runtime(format!("Failed to read: {}", e)).in_export(input))?;

    let entries: Vec<ScheduleEntry> = serde_json::from_str(&contents).map_err(|e| {
        CliError::input(format!("Invalid schedule rows: {}", e)).in_export(input)
    })?;
    if entries.is_empty() {
        return Err(CliError::input("No schedule rows").in_export(input).with_rows(0));
    }

    debug!(rows = entries.len(), input, "schedule rows loaded");
    Ok(entries)
}

/// Reject a run where not a single row had parseable times.
pub fn ensure_parseable(report: &Report, input: &str) -> CliResult<()> {
    let metadata = &report.metadata;
    if metadata.total_entries > 0 && metadata.unparsable_times == metadata.total_entries {
        return Err(CliError::input("No row has parseable start and end times")
            .in_export(input)
            .with_rows(metadata.total_entries));
    }
    Ok(())
}

pub fn parse_target_date(date: Option<&str>) -> CliResult<Option<NaiveDate>> {
    date.map(|d| {
        parse_schedule_date(d)
            .map_err(|e| CliError::input(format!("{}. Expected: MM/DD/YYYY", e)))
    })
    .transpose()
}

/// Narrow `report` to the states of `groups`; no groups keeps everything.
pub fn apply_groups(
    report: Report,
    catalog: &StateCatalog,
    groups: &[String],
) -> CliResult<Report> {
    if groups.is_empty() {
        return Ok(report);
    }

    let known = catalog.get_all_groups();
    let mut allowed = Vec::new();
    for group in groups {
        if !known.iter().any(|g| g.eq_ignore_ascii_case(group)) {
            return Err(CliError::input(format!(
                "Unknown group '{}'. Expected one of: {}",
                group,
                known.join(", ")
            )));
        }
        allowed.extend(catalog.states_in_group(group));
    }

    Ok(filter_by_canonical_states(&report, &allowed))
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::runtime(format!("Failed to serialize JSON: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Plain-text rendering of a report. Only buckets with minutes are listed.
pub fn render_report_text(report: &Report) -> String {
    let m = &report.metadata;
    let date_range = match &m.date_range {
        Some(range) => format!("{} - {}", range.start, range.end),
        None => "none".to_string(),
    };

    let mut lines = vec![
        format!("Reference timezone: {}", m.reference_timezone),
        format!("Target date: {}", m.target_date.as_deref().unwrap_or("all")),
        format!(
            "Entries: {} total, {} processed, {} skipped",
            m.total_entries, m.processed_entries, m.skipped_entries
        ),
        format!(
            "Skipped: {} excluded, {} out of range, {} unparsable times",
            m.excluded_entries, m.out_of_range_entries, m.unparsable_times
        ),
        format!(
            "Fallbacks: {} unknown timezones, {} invalid dates, {} conversions",
            m.unknown_timezones, m.invalid_dates, m.conversion_fallbacks
        ),
        format!("Date range: {}", date_range),
        format!("Agents: {}, states: {}", m.unique_agents, m.unique_states),
        String::new(),
        "State totals:".to_string(),
    ];

    lines.extend(report.state_totals.iter().map(|(name, totals)| {
        format!(
            "  {}: {} ({} agents, {} entries)",
            name,
            format_duration(totals.total_duration),
            totals.total_agents,
            totals.total_count
        )
    }));

    lines.push(String::new());
    lines.push("Intervals:".to_string());
    for summary in report.intervals.iter().filter(|s| !s.states.is_empty()) {
        lines.push(format!("  {}", summary.interval.label));
        lines.extend(summary.states.iter().map(|(name, totals)| {
            format!(
                "    {}: {} ({} agents)",
                name,
                format_duration(totals.total_duration),
                totals.agent_count
            )
        }));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
