use std::process::ExitCode;

use rosterbucket_core::ScheduleAggregator;
use tracing::debug;

use crate::cli::AnalyzeArgs;
use crate::error::{CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{
    apply_groups, ensure_parseable, load_context, parse_target_date, print_json, read_entries,
    render_report_text,
};

pub fn run_analyze(args: AnalyzeArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let context = load_context(&args.settings)?;
    let target = parse_target_date(args.date.as_deref())?;
    let entries = read_entries(&args.input)?;

    let aggregator = ScheduleAggregator::new(&context.catalog, context.reference);
    let report = aggregator.process_schedule_data(&entries, target);
    ensure_parseable(&report, &args.input)?;
    debug!(metadata = ?report.metadata, "analysis complete");

    let report = apply_groups(report, &context.catalog, &args.group)?;

    match output_format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print!("{}", render_report_text(&report)),
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}
