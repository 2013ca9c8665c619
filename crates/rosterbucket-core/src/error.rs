//! Error types for rosterbucket-core.
//!
//! Per-row problems are represented here so the building blocks can
//! return them, but the aggregation layer never propagates them: each one
//! is logged, counted in the report metadata and replaced by a fallback.

use thiserror::Error;

/// The main error type for rosterbucket operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// No known clock-time pattern matched the input.
    #[error("Unparsable time: {0}")]
    UnparsableTime(String),

    /// Timezone alias could not be resolved to an IANA zone.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Schedule date could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// DST math failed for a zone/date combination.
    #[error("Conversion failure: {0}")]
    ConversionFailure(String),

    /// The state catalog snapshot is inconsistent.
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias for rosterbucket operations.
pub type Result<T> = std::result::Result<T, RosterError>;
