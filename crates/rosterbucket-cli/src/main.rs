use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod analyze_cmd;
mod cli;
mod compare_cmd;
mod convert_cmd;
mod error;
mod match_cmd;
mod settings;
mod shared;

use analyze_cmd::run_analyze;
use cli::{Cli, Commands};
use compare_cmd::run_compare;
use convert_cmd::run_convert;
use error::{CliResult, OutputFormat, render_error};
use match_cmd::run_match;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("Parsed CLI args: {:?}", cli);

    match cli.command {
        Commands::Analyze(args) => {
            let format = args.output_format.clone();
            dispatch(&format, |output_format| run_analyze(args, output_format))
        }
        Commands::Compare(args) => {
            let format = args.output_format.clone();
            dispatch(&format, |output_format| run_compare(args, output_format))
        }
        Commands::Match(args) => {
            let format = args.output_format.clone();
            dispatch(&format, |output_format| run_match(args, output_format))
        }
        Commands::Convert(args) => {
            let format = args.output_format.clone();
            dispatch(&format, |output_format| run_convert(args, output_format))
        }
    }
}

fn dispatch<F>(format: &str, run: F) -> ExitCode
where
    F: FnOnce(OutputFormat) -> CliResult<ExitCode>,
{
    let fallback = OutputFormat::fallback_for(format);
    let output_format = match format.parse::<OutputFormat>() {
        Ok(format) => format,
        Err(err) => return render_error(&err, fallback),
    };

    match run(output_format) {
        Ok(code) => code,
        Err(err) => render_error(&err, output_format),
    }
}
