//! Error types for the ledd_core library.

use chrono::NaiveTime;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ledd_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Malformed prescription or profile input
    #[error("Input error: {0}")]
    Input(String),

    /// Schedule synthesis could not run
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Conditions that stop the schedule synthesizer.
///
/// These never abort a recalculation as a whole: the LEDD summary and the
/// warning list are still produced when synthesis fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Wake or sleep time is not set on the patient profile
    #[error("patient profile is missing its {field} time")]
    MissingProfileAnchor { field: &'static str },

    /// Wake time is not strictly before sleep time
    #[error("wake time {wake} must be before sleep time {sleep}")]
    InvalidDayWindow { wake: NaiveTime, sleep: NaiveTime },
}
