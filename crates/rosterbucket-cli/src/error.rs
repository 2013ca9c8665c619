//! Exit codes and the error envelope printed on stderr.
//!
//! Errors about a schedule export carry the export's path (`-` for stdin)
//! and, once rows have been read, how many there were, so a batch job can
//! tell which of `compare`'s two inputs was rejected.

use std::fmt;
use std::process::ExitCode;
use std::str::FromStr;

use serde::Serialize;

pub const EXIT_SUCCESS: u8 = 0;
/// Bad arguments, settings or schedule rows.
pub const EXIT_INPUT_ERROR: u8 = 2;
/// I/O or serialization failure.
pub const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl OutputFormat {
    /// Format for reporting a rejected `--output-format` value: JSON when
    /// the caller evidently wanted JSON, text otherwise.
    pub fn fallback_for(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(raw: &str) -> CliResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            _ => Err(CliError::input(format!(
                "Invalid output format '{}'. Expected: json, text",
                raw
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Input,
    Runtime,
}

impl ErrorKind {
    fn exit_code(self) -> u8 {
        match self {
            Self::Input => EXIT_INPUT_ERROR,
            Self::Runtime => EXIT_RUNTIME_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    kind: ErrorKind,
    message: String,
    export: Option<String>,
    rows: Option<usize>,
}

impl CliError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            export: None,
            rows: None,
        }
    }

    /// Attribute the error to the schedule export at `path`.
    pub fn in_export(mut self, path: &str) -> Self {
        self.export = Some(path.to_string());
        self
    }

    /// Record how many rows the export held.
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }

    fn envelope(&self) -> ErrorEnvelope<'_> {
        ErrorEnvelope {
            error: &self.message,
            kind: self.kind,
            exit_code: self.exit_code(),
            export: self.export.as_deref(),
            rows: self.rows,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.export, self.rows) {
            (Some(export), Some(rows)) => {
                write!(f, "{}: {} ({} rows)", export, self.message, rows)
            }
            (Some(export), None) => write!(f, "{}: {}", export, self.message),
            (None, _) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CliError {}

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a str,
    kind: ErrorKind,
    exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    export: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<usize>,
}

/// Print `err` on stderr in `output_format` and turn it into an exit code.
pub fn render_error(err: &CliError, output_format: OutputFormat) -> ExitCode {
    let json = match output_format {
        OutputFormat::Json => serde_json::to_string_pretty(&err.envelope()).ok(),
        OutputFormat::Text => None,
    };
    match json {
        Some(json) => eprintln!("{}", json),
        None => eprintln!("Error: {}", err),
    }

    ExitCode::from(err.exit_code())
}
