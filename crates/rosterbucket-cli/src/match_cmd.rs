use std::process::ExitCode;

use rosterbucket_core::StateMatcher;
use serde::Serialize;

use crate::cli::MatchArgs;
use crate::error::{CliResult, EXIT_SUCCESS, OutputFormat};
use crate::shared::{load_context, print_json};

#[derive(Debug, Serialize)]
struct MatchResult {
    label: String,
    state: String,
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    time_off: bool,
}

pub fn run_match(args: MatchArgs, output_format: OutputFormat) -> CliResult<ExitCode> {
    let context = load_context(&args.settings)?;
    let catalog = &context.catalog;
    let matcher = StateMatcher::new(catalog);

    let results: Vec<MatchResult> = args
        .label
        .iter()
        .map(|label| {
            let state = matcher.match_label(label);
            let canonical = catalog.state(&state);
            MatchResult {
                label: label.clone(),
                matched: canonical.is_some(),
                group: canonical
                    .map(|s| s.group.clone())
                    .filter(|g| !g.is_empty()),
                time_off: catalog.is_time_off(&state),
                state,
            }
        })
        .collect();

    match output_format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Text => {
            for result in &results {
                let suffix = match (&result.group, result.matched) {
                    (Some(group), _) => format!(" [{}]", group),
                    (None, true) => String::new(),
                    (None, false) => " (no match)".to_string(),
                };
                println!("{} -> {}{}", result.label, result.state, suffix);
            }
        }
    }

    Ok(ExitCode::from(EXIT_SUCCESS))
}
