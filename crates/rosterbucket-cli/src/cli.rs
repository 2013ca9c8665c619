use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Workforce schedule interval analysis
#[derive(Parser, Debug)]
#[command(name = "rosterbucket", version)]
#[command(about = "Aggregate workforce schedules into half-hour intervals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug) logging
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate schedule rows into per-interval state totals
    Analyze(AnalyzeArgs),
    /// Compare two schedule exports
    Compare(CompareArgs),
    /// Resolve a free-text state label to its canonical state
    Match(MatchArgs),
    /// Explain how one local time converts into the reference timezone
    Convert(ConvertArgs),
}

/// Options shared by every command that reads settings.
#[derive(clap::Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Settings file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Reference timezone, overrides the settings file
    #[arg(long)]
    pub reference_tz: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Input file with a JSON array of schedule rows (use - for stdin)
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Restrict to one reference-timezone date (MM/DD/YYYY)
    #[arg(long)]
    pub date: Option<String>,

    /// Only show states of this group (repeatable)
    #[arg(long)]
    pub group: Vec<String>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct CompareArgs {
    /// Schedule export before the change
    #[arg(long)]
    pub before: String,

    /// Schedule export after the change
    #[arg(long)]
    pub after: String,

    /// Restrict to one reference-timezone date (MM/DD/YYYY)
    #[arg(long)]
    pub date: Option<String>,

    /// Only compare states of this group (repeatable)
    #[arg(long)]
    pub group: Vec<String>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct MatchArgs {
    /// Free-text state label (repeatable)
    #[arg(long, required = true)]
    pub label: Vec<String>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Output format: json, text
    #[arg(long, default_value = "text")]
    pub output_format: String,
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Source timezone (abbreviation, alias or IANA id)
    #[arg(short, long)]
    pub tz: String,

    /// Source date (MM/DD/YYYY)
    #[arg(long)]
    pub date: String,

    /// Source clock time, day-offset notation allowed (e.g. "+12:45 AM")
    #[arg(long)]
    pub time: String,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Output format: json, text
    #[arg(long, default_value = "json")]
    pub output_format: String,
}
