/// Error types for gauge record handling
use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for gauge record operations
#[derive(Error, Debug)]
pub enum GaugeError {
    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to read an input file
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Window end precedes its start
    #[error("Invalid analysis window: {start} is after {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    /// Window length cannot be subtracted from the reference date
    #[error("Window of {years} years cannot end at {end}")]
    WindowOutOfRange { years: u32, end: NaiveDate },

    /// Month number outside 1-12
    #[error("{0}")]
    InvalidMonth(String),
}

/// Type alias for Results using GaugeError
pub type Result<T> = std::result::Result<T, GaugeError>;
