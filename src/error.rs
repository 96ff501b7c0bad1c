// ⚠️ Error taxonomy for the growth-metrics pipeline
// Errors are returned to the caller; logging them is the caller's job

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while validating and aggregating input rows.
///
/// All of them are detected before any percent-change is computed, so a
/// failing call never produces a partial table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("row {row}: malformed period '{value}' in field '{field}' (expected YYYY-MM)")]
    MalformedPeriod {
        row: usize,
        field: String,
        value: String,
    },

    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: String },

    #[error("row {row}: value '{value}' in field '{field}' is not numeric")]
    InvalidValue {
        row: usize,
        field: String,
        value: String,
    },

    #[error("input contains no rows")]
    EmptyInput,

    #[error("at least one group field is required")]
    NoGroupFields,
}

/// Log an error and append it to `<logs_dir>/error_log.txt`.
///
/// Returns the log file path so callers can point the user at it.
pub fn report_error(
    error: &dyn std::fmt::Display,
    message: &str,
    logs_dir: &Path,
) -> Result<PathBuf> {
    let error_time = Local::now().format("%Y-%m-%d %H:%M:%S");
    let entry = format!("[{}] Error: {}\nDetails: {}", error_time, message, error);

    tracing::error!(details = %error, "{}", message);

    fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
    let log_path = logs_dir.join("error_log.txt");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {}", log_path.display()))?;
    writeln!(file, "{}\n", entry)?;

    Ok(log_path)
}
