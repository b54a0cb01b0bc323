/// Error types for HMF analysis
use hmf_gauge::error::GaugeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The site has no records inside the analysis window
    #[error("No discharge records for site {site_no} in the analysis window")]
    DataAbsent { site_no: String },

    /// A threshold was requested from an empty set of values
    #[error("Cannot compute a threshold from an empty series")]
    EmptySeries,

    /// Quantile outside the open interval (0, 1)
    #[error("Quantile must be between 0 and 1 exclusive, got {0}")]
    InvalidQuantile(f64),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Configuration file is not valid JSON for the config schema
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error(transparent)]
    Gauge(#[from] GaugeError),
}

/// Type alias for Results using AnalysisError
pub type Result<T> = std::result::Result<T, AnalysisError>;
