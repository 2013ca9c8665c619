use std::process::ExitCode;

use rosterbucket_core::parse::format_duration;
use rosterbucket_core::{Comparison, Report, ScheduleAggregator, compare_reports};
use similar::TextDiff;

use crate::cli::CompareArgs;
use crate::error::{CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{
    apply_groups, ensure_parseable, load_context, parse_target_date, print_json, read_entries,
    render_report_text,
};

pub fn run_compare(args: CompareArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let context = load_context(&args.settings)?;
    let target = parse_target_date(args.date.as_deref())?;
    let aggregator = ScheduleAggregator::new(&context.catalog, context.reference);

    let mut reports = Vec::with_capacity(2);
    for input in [&args.before, &args.after] {
        let entries = read_entries(input)?;
        let report = aggregator.process_schedule_data(&entries, target);
        ensure_parseable(&report, input)?;
        reports.push(apply_groups(report, &context.catalog, &args.group)?);
    }
    let (before, after) = (&reports[0], &reports[1]);
    let comparison = compare_reports(before, after);

    match output_format {
        OutputFormat::Json => print_json(&comparison)?,
        OutputFormat::Text => {
            print!("{}", render_comparison_text(&args, before, after, &comparison))
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}

fn render_comparison_text(
    args: &CompareArgs,
    before: &Report,
    after: &Report,
    comparison: &Comparison,
) -> String {
    let old = render_report_text(before);
    let new = render_report_text(after);

    let mut out = String::from("State changes:\n");
    let mut changed = 0;
    for (name, state) in comparison.changed_states() {
        changed += 1;
        out.push_str(&format!(
            "  {}: {} -> {} ({}{}), agents {} -> {}\n",
            name,
            format_duration(state.minutes.before),
            format_duration(state.minutes.after),
            if state.minutes.delta >= 0.0 { "+" } else { "" },
            format_duration(state.minutes.delta),
            state.agents.before,
            state.agents.after
        ));
    }
    if changed == 0 {
        out.push_str("  none\n");
    }

    out.push('\n');
    out.push_str(
        &TextDiff::from_lines(&old, &new)
            .unified_diff()
            .context_radius(2)
            .header(&args.before, &args.after)
            .to_string(),
    );
    out
}
