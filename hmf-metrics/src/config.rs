use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use hmf_gauge::hydro_year::{HydrologicCalendar, MonthWindow};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seconds in one day, converts a daily mean rate (ft³/s) to a daily volume.
pub const SEC_PER_DAY: f64 = 86400.0;

/// Cubic feet to cubic kilometres.
pub const CUBIC_FT_KM_FACTOR: f64 = 0.0000000000283168466;

/// Quantile levels analysed by default.
pub const DEFAULT_QUANTILES: [f64; 2] = [0.90, 0.95];

/// Window lengths (years) analysed by default.
pub const DEFAULT_WINDOW_LENGTHS: [u32; 2] = [30, 50];

/// Everything the metrics pipeline needs to know about one analysis run.
///
/// Constructed once and passed by reference into every step, so separate
/// runs with different settings never share state. All fields have
/// defaults; a JSON file only needs to name the ones it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Quantile levels for the HMF threshold
    pub quantiles: Vec<f64>,
    /// Window lengths in years, each ending on `reference_end`
    pub window_lengths: Vec<u32>,
    /// Last day of every analysis window
    pub reference_end: NaiveDate,
    /// Minimum span of the full record for a site to be valid
    pub min_record_years: u32,
    /// Largest fraction of missing days in the window for a valid site
    pub max_missing_fraction: f64,
    /// Significance level of the trend test
    pub trend_alpha: f64,
    pub hydrologic_year_start_month: u32,
    pub seconds_per_day: f64,
    /// Multiplier from raw excess volume (ft³) to the reporting unit (km³)
    pub volume_factor: f64,
    pub three_month_window: MonthWindow,
    pub six_month_window: MonthWindow,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            quantiles: DEFAULT_QUANTILES.to_vec(),
            window_lengths: DEFAULT_WINDOW_LENGTHS.to_vec(),
            reference_end: NaiveDate::from_ymd_opt(2020, 9, 30).unwrap(),
            min_record_years: 50,
            max_missing_fraction: 0.10,
            trend_alpha: 0.05,
            hydrologic_year_start_month: 10,
            seconds_per_day: SEC_PER_DAY,
            volume_factor: CUBIC_FT_KM_FACTOR,
            three_month_window: MonthWindow { start: 12, end: 2 },
            six_month_window: MonthWindow { start: 11, end: 4 },
        }
    }
}

/// Tag grouping output tables by analysis configuration:
/// `window_length × quantile`, rounded to 6 decimals so that e.g.
/// 30 × 0.9 groups as exactly 27.
pub fn dataset_id(window_years: u32, quantile: f64) -> f64 {
    (window_years as f64 * quantile * 1e6).round() / 1e6
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        AnalysisConfig::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfig(msg));
        if self.quantiles.is_empty() {
            return invalid("at least one quantile is required".into());
        }
        if let Some(q) = self.quantiles.iter().find(|q| !(**q > 0.0 && **q < 1.0)) {
            return Err(AnalysisError::InvalidQuantile(*q));
        }
        if self.window_lengths.is_empty() || self.window_lengths.contains(&0) {
            return invalid("window lengths must be non-empty and positive".into());
        }
        if !(0.0..=1.0).contains(&self.max_missing_fraction) {
            return invalid(format!(
                "max_missing_fraction {} outside [0, 1]",
                self.max_missing_fraction
            ));
        }
        if !(self.trend_alpha > 0.0 && self.trend_alpha < 1.0) {
            return invalid(format!("trend_alpha {} outside (0, 1)", self.trend_alpha));
        }
        if !(self.seconds_per_day > 0.0) || !(self.volume_factor > 0.0) {
            return invalid("seconds_per_day and volume_factor must be positive".into());
        }
        HydrologicCalendar::new(self.hydrologic_year_start_month)?;
        for window in [self.three_month_window, self.six_month_window] {
            MonthWindow::new(window.start, window.end)?;
        }
        Ok(())
    }

    pub fn calendar(&self) -> HydrologicCalendar {
        HydrologicCalendar::new(self.hydrologic_year_start_month).unwrap_or_default()
    }

    /// Every (window length, quantile) pair, window-major.
    pub fn combinations(&self) -> Vec<(u32, f64)> {
        self.window_lengths
            .iter()
            .flat_map(|&years| self.quantiles.iter().map(move |&q| (years, q)))
            .collect()
    }

    /// Convert a raw excess volume to the reporting unit.
    pub fn to_reporting_volume(&self, raw: f64) -> f64 {
        raw * self.volume_factor
    }
}

#[cfg(test)]
mod tests {
    use super::{dataset_id, AnalysisConfig};
    use crate::error::AnalysisError;
    use chrono::NaiveDate;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.min_record_years, 50);
        assert_eq!(config.calendar().start_month(), 10);
        assert_eq!(
            config.combinations(),
            vec![(30, 0.90), (30, 0.95), (50, 0.90), (50, 0.95)]
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json_str(
            r#"{"quantiles": [0.99], "reference_end": "2010-09-30",
                "six_month_window": {"start": 4, "end": 9}}"#,
        )
        .unwrap();
        assert_eq!(config.quantiles, vec![0.99]);
        assert_eq!(config.reference_end, NaiveDate::from_ymd_opt(2010, 9, 30).unwrap());
        assert_eq!(config.six_month_window.start, 4);
        assert_eq!(config.window_lengths, vec![30, 50]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            AnalysisConfig::from_json_str(r#"{"quantiles": [1.5]}"#),
            Err(AnalysisError::InvalidQuantile(_))
        ));
        assert!(AnalysisConfig::from_json_str(r#"{"hydrologic_year_start_month": 13}"#).is_err());
        assert!(AnalysisConfig::from_json_str(r#"{"window_lengths": []}"#).is_err());
        assert!(
            AnalysisConfig::from_json_str(r#"{"three_month_window": {"start": 0, "end": 2}}"#)
                .is_err()
        );
        assert!(AnalysisConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_dataset_id() {
        assert_eq!(dataset_id(30, 0.90), 27.0);
        assert_eq!(dataset_id(50, 0.95), 47.5);
        assert_eq!(dataset_id(30, 0.95), 28.5);
    }
}
