use std::process::ExitCode;

use chrono::Duration;
use rosterbucket_core::ConversionMethod;
use rosterbucket_core::parse::{
    format_schedule_date, minutes_to_time_string, parse_clock_time_with_day_offset,
};
use rosterbucket_core::tz::{convert_to_reference, offset_minutes, resolve_zone};
use serde::Serialize;

use crate::cli::ConvertArgs;
use crate::error::{CliError, CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{load_context, parse_target_date, print_json};

#[derive(Debug, Serialize)]
struct ConvertResult {
    source_tz: String,
    source_date: String,
    source_time: String,
    day_offset: u32,
    source_offset_minutes: i32,
    reference_tz: String,
    reference_offset_minutes: i32,
    reference_date: String,
    reference_time: String,
    method: ConversionMethod,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub fn run_convert(args: ConvertArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let context = load_context(&args.settings)?;
    let reference = context.reference;

    let date = parse_target_date(Some(args.date.as_str()))?
        .ok_or_else(|| CliError::input("Missing date"))?;
    let parsed = parse_clock_time_with_day_offset(&args.time);
    let minutes = parsed.minutes.ok_or_else(|| {
        CliError::input(format!(
            "Unparsable time '{}'. Expected e.g. 4:00 PM, 16:00 or +12:45 AM",
            args.time
        ))
    })?;
    let local_date = date
        .checked_add_signed(Duration::days(i64::from(parsed.day_offset)))
        .ok_or_else(|| {
            CliError::input(format!("Day offset {} is out of range", parsed.day_offset))
        })?;

    let resolution = resolve_zone(&args.tz, reference);
    let converted = convert_to_reference(minutes, resolution.tz, local_date, reference);

    let result = ConvertResult {
        source_tz: resolution.tz.name().to_string(),
        source_date: format_schedule_date(local_date),
        source_time: minutes_to_time_string(minutes),
        day_offset: parsed.day_offset,
        source_offset_minutes: offset_minutes(resolution.tz, local_date),
        reference_tz: reference.name().to_string(),
        reference_offset_minutes: offset_minutes(reference, converted.date),
        reference_date: format_schedule_date(converted.date),
        reference_time: minutes_to_time_string(converted.minutes),
        method: converted.method,
        warnings: resolution.warning.into_iter().collect(),
    };

    match output_format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => {
            println!(
                "{} {} ({}) -> {} {} ({})",
                result.source_date,
                result.source_time,
                result.source_tz,
                result.reference_date,
                result.reference_time,
                result.reference_tz
            );
            println!(
                "Offsets: {:+} min -> {:+} min",
                result.source_offset_minutes, result.reference_offset_minutes
            );
            println!("Method: {}", result.method);
            for warning in &result.warnings {
                println!("Warning: {}", warning);
            }
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}
