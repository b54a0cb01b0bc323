//! Record completeness checks that gate whether a site is analysable.

use crate::config::AnalysisConfig;
use hmf_gauge::series::DischargeSeries;
use hmf_gauge::window::AnalysisWindow;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Completeness {
    /// Fraction of the window's calendar days with no record, never negative
    pub missing_fraction: f64,
    /// Whether the full record spans the configured minimum number of years
    pub spans_min_years: bool,
    pub valid: bool,
}

/// `max(0, 1 - observed / expected)` where expected is the inclusive day
/// count of the window.
pub fn missing_fraction(series: &DischargeSeries, window: &AnalysisWindow) -> f64 {
    let observed = series
        .days()
        .iter()
        .filter(|day| window.contains(&day.date))
        .count();
    let expected = window.expected_days();
    (1.0 - observed as f64 / expected as f64).max(0.0)
}

/// Assess a site. `full_record` is the whole series, used for the span
/// check; only days inside `window` count toward completeness.
pub fn assess(
    full_record: &DischargeSeries,
    window: &AnalysisWindow,
    config: &AnalysisConfig,
) -> Completeness {
    let missing_fraction = missing_fraction(full_record, window);
    let spans_min_years = full_record.spans_years(config.min_record_years);
    Completeness {
        missing_fraction,
        spans_min_years,
        valid: missing_fraction <= config.max_missing_fraction && spans_min_years,
    }
}
