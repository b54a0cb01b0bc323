//! Runs the whole pipeline for one site and one (window, quantile) pair and
//! flattens the results into output rows.

use crate::annual::{aggregate, AnnualSummary, AnnualTable};
use crate::completeness::assess;
use crate::config::{dataset_id, AnalysisConfig};
use crate::error::{AnalysisError, Result};
use crate::seasonal::{seasonal_aggregates, yearly_timing};
use crate::segment::{segment, HmfEvent};
use crate::threshold::hmf_threshold;
use crate::trend::{trend_pair, TrendMetric, TrendRow};
use chrono::NaiveDate;
use hmf_gauge::series::DischargeSeries;
use hmf_gauge::window::AnalysisWindow;
use log::{debug, warn};
use serde::Serialize;

/// The per-site, per-combination output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteMetricRecord {
    pub site_no: String,
    #[serde(rename = "dataset_ID")]
    pub dataset_id: f64,
    /// Window length in years
    pub analyze_range: u32,
    pub quantile: f64,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub valid: bool,
    pub missing_fraction: f64,
    pub threshold: f64,
    /// Years in the window with at least one HMF day
    pub hmf_years: u32,
    pub annual_hmf: f64,
    pub annual_duration: f64,
    pub event_duration: f64,
    pub event_hmf: f64,
    pub inter_annual: f64,
    pub intra_annual: f64,
    pub six_mo_hmf: f64,
    pub three_mo_hmf: f64,
    pub timing: f64,
    pub one_day_peaks: u32,
    pub jan_hmf: f64,
    pub feb_hmf: f64,
    pub mar_hmf: f64,
    pub apr_hmf: f64,
    pub may_hmf: f64,
    pub jun_hmf: f64,
    pub jul_hmf: f64,
    pub aug_hmf: f64,
    pub sep_hmf: f64,
    pub oct_hmf: f64,
    pub nov_hmf: f64,
    pub dec_hmf: f64,
}

impl SiteMetricRecord {
    /// Monthly profile, January first.
    pub fn monthly(&self) -> [f64; 12] {
        [
            self.jan_hmf,
            self.feb_hmf,
            self.mar_hmf,
            self.apr_hmf,
            self.may_hmf,
            self.jun_hmf,
            self.jul_hmf,
            self.aug_hmf,
            self.sep_hmf,
            self.oct_hmf,
            self.nov_hmf,
            self.dec_hmf,
        ]
    }
}

/// One annual summary row tagged with its site and dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualRow {
    pub site_no: String,
    #[serde(rename = "dataset_ID")]
    pub dataset_id: f64,
    pub year: i32,
    pub hmf_volume: f64,
    pub hmf_days: u32,
    pub events: u32,
    pub event_volume: f64,
    pub event_duration: f64,
    pub timing: f64,
}

impl AnnualRow {
    fn new(site_no: &str, dataset_id: f64, summary: &AnnualSummary) -> Self {
        AnnualRow {
            site_no: site_no.to_string(),
            dataset_id,
            year: summary.year,
            hmf_volume: summary.hmf_volume,
            hmf_days: summary.hmf_days,
            events: summary.events,
            event_volume: summary.event_volume,
            event_duration: summary.event_duration,
            timing: summary.timing,
        }
    }
}

/// Everything produced for one site under one (window, quantile) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteAnalysis {
    pub metrics: SiteMetricRecord,
    pub annual: Vec<AnnualRow>,
    /// One row per tracked metric, in [`TrendMetric::ALL`] order; empty
    /// for an invalid site
    pub trends: Vec<TrendRow>,
    pub events: Vec<HmfEvent>,
}

/// Analyse `full_record` over the window of `window_years` ending on the
/// configured reference date, with the threshold at `quantile`.
///
/// Invalid sites (too much missing data or too short a record) are still
/// analysed and come back with `valid == false` and no trend rows; only a
/// window with no records at all is an error.
pub fn analyze_site(
    full_record: &DischargeSeries,
    config: &AnalysisConfig,
    window_years: u32,
    quantile: f64,
) -> Result<SiteAnalysis> {
    let site_no = full_record.site_no();
    let window = AnalysisWindow::trailing_years(config.reference_end, window_years)?;
    let series = full_record.within(&window);
    if series.is_empty() {
        return Err(AnalysisError::DataAbsent {
            site_no: site_no.to_string(),
        });
    }

    let completeness = assess(full_record, &window, config);
    if !completeness.valid {
        warn!(
            "Site {} invalid for {}y window: missing {:.3}, spans {} years: {}",
            site_no,
            window_years,
            completeness.missing_fraction,
            config.min_record_years,
            completeness.spans_min_years
        );
    }

    let threshold = hmf_threshold(series.discharges(), quantile)?;
    let calendar = config.calendar();
    let segmented = segment(&series, threshold, config.seconds_per_day, &calendar);
    let timing = yearly_timing(&segmented, &calendar);
    let mut table = AnnualTable::from_segments(&segmented, &calendar, config);
    table.attach_timing(&timing);

    let annual = aggregate(&table, window_years);
    let seasonal = seasonal_aggregates(&segmented, &timing, config, annual.active_years);
    let id = dataset_id(window_years, quantile);
    debug!(
        "Site {} dataset {}: threshold {:.3}, {} events in {} active years",
        site_no,
        id,
        threshold,
        segmented.events.len(),
        annual.active_years
    );

    // invalid sites stay out of trend analysis
    let trends = if completeness.valid {
        TrendMetric::ALL
            .iter()
            .map(|metric| {
                let pair = trend_pair(*metric, &table, config.trend_alpha);
                TrendRow::new(site_no, id, *metric, &pair)
            })
            .collect()
    } else {
        Vec::new()
    };

    let [jan, feb, mar, apr, may, jun, jul, aug, sep, oct, nov, dec] = seasonal.monthly;
    let metrics = SiteMetricRecord {
        site_no: site_no.to_string(),
        dataset_id: id,
        analyze_range: window_years,
        quantile,
        window_start: window.start,
        window_end: window.end,
        valid: completeness.valid,
        missing_fraction: completeness.missing_fraction,
        threshold,
        hmf_years: annual.active_years,
        annual_hmf: annual.annual_hmf,
        annual_duration: annual.annual_duration,
        event_duration: annual.event_duration,
        event_hmf: annual.event_hmf,
        inter_annual: annual.inter_annual,
        intra_annual: annual.intra_annual,
        six_mo_hmf: seasonal.six_month_hmf,
        three_mo_hmf: seasonal.three_month_hmf,
        timing: seasonal.timing,
        one_day_peaks: segmented.one_day_peaks() as u32,
        jan_hmf: jan,
        feb_hmf: feb,
        mar_hmf: mar,
        apr_hmf: apr,
        may_hmf: may,
        jun_hmf: jun,
        jul_hmf: jul,
        aug_hmf: aug,
        sep_hmf: sep,
        oct_hmf: oct,
        nov_hmf: nov,
        dec_hmf: dec,
    };

    Ok(SiteAnalysis {
        metrics,
        annual: table
            .years
            .iter()
            .map(|row| AnnualRow::new(site_no, id, row))
            .collect(),
        trends,
        events: segmented.events,
    })
}

/// Analyse one site for every configured (window, quantile) pair. Each
/// pair succeeds or fails on its own.
pub fn analyze_site_all(
    full_record: &DischargeSeries,
    config: &AnalysisConfig,
) -> Vec<(u32, f64, Result<SiteAnalysis>)> {
    config
        .combinations()
        .into_iter()
        .map(|(years, q)| (years, q, analyze_site(full_record, config, years, q)))
        .collect()
}

/// Split records into (valid, invalid), preserving order.
pub fn partition_by_validity(
    records: Vec<SiteMetricRecord>,
) -> (Vec<SiteMetricRecord>, Vec<SiteMetricRecord>) {
    records.into_iter().partition(|record| record.valid)
}

#[cfg(test)]
mod tests {
    use super::{analyze_site, analyze_site_all, partition_by_validity};
    use crate::config::AnalysisConfig;
    use crate::error::AnalysisError;
    use crate::trend::TrendMetric;
    use chrono::{Datelike, NaiveDate};
    use hmf_gauge::series::{DailyFlow, DischargeSeries};
    use hmf_gauge::window::AnalysisWindow;

    fn short_config() -> AnalysisConfig {
        AnalysisConfig {
            window_lengths: vec![3],
            quantiles: vec![0.9],
            min_record_years: 3,
            reference_end: NaiveDate::from_ymd_opt(2020, 9, 30).unwrap(),
            ..AnalysisConfig::default()
        }
    }

    /// Three complete hydrologic years, flow 100 except a 3-day spike each
    /// January.
    fn seasonal_site(config: &AnalysisConfig) -> DischargeSeries {
        let window = AnalysisWindow::trailing_years(config.reference_end, 3).unwrap();
        let days = window
            .days()
            .map(|date| {
                let spike = date.month() == 1 && (10..13).contains(&date.day());
                DailyFlow::new(date, if spike { 1000.0 } else { 100.0 })
            })
            .collect();
        DischargeSeries::new("01234567", days)
    }

    #[test]
    fn test_full_pipeline() {
        let config = short_config();
        let series = seasonal_site(&config);
        let analysis = analyze_site(&series, &config, 3, 0.9).unwrap();
        let m = &analysis.metrics;

        assert!(m.valid);
        assert_eq!(m.missing_fraction, 0.0);
        assert_eq!(m.dataset_id, 2.7);
        assert_eq!(m.threshold, 100.0);
        assert_eq!(m.hmf_years, 3);
        assert_eq!(m.annual_duration, 3.0);
        assert_eq!(m.intra_annual, 1.0);
        assert_eq!(m.inter_annual, 100.0);
        assert_eq!(m.one_day_peaks, 0);
        // all HMF falls in January, inside both seasonal windows
        assert!((m.three_mo_hmf - m.annual_hmf).abs() < 1e-15);
        assert!((m.six_mo_hmf - m.annual_hmf).abs() < 1e-15);
        // Jan 11 is day 103 of the hydrologic year
        assert_eq!(m.timing, 103.0);
        assert!(m.jan_hmf > 0.0);
        assert_eq!(m.monthly().iter().filter(|v| **v > 0.0).count(), 1);

        assert_eq!(analysis.annual.len(), 3);
        assert_eq!(analysis.events.len(), 3);
        assert_eq!(analysis.trends.len(), TrendMetric::ALL.len());
        assert_eq!(analysis.trends[0].metric, "magnitude");
        assert!(analysis.trends.iter().all(|row| row.site_no == "01234567"));
    }

    #[test]
    fn test_missing_data_marks_invalid_but_still_computes() {
        let config = short_config();
        let full = seasonal_site(&config);
        let days: Vec<DailyFlow> = full
            .days()
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 2 == 0)
            .map(|(_, d)| *d)
            .collect();
        let sparse = DischargeSeries::new("07654321", days);
        let analysis = analyze_site(&sparse, &config, 3, 0.9).unwrap();
        assert!(!analysis.metrics.valid);
        assert!(analysis.metrics.missing_fraction > 0.4);
        assert_eq!(analysis.annual.len(), 3);
        assert!(analysis.trends.is_empty());
    }

    #[test]
    fn test_no_records_in_window_is_data_absent() {
        let config = short_config();
        let old = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
        let series = DischargeSeries::new("09999999", vec![DailyFlow::new(old, 5.0)]);
        assert!(matches!(
            analyze_site(&series, &config, 3, 0.9),
            Err(AnalysisError::DataAbsent { .. })
        ));
    }

    #[test]
    fn test_all_combinations_and_partition() {
        let config = AnalysisConfig {
            window_lengths: vec![3, 5],
            quantiles: vec![0.9, 0.95],
            ..short_config()
        };
        let series = seasonal_site(&config);
        let results = analyze_site_all(&series, &config);
        assert_eq!(results.len(), 4);
        assert_eq!((results[2].0, results[2].1), (5, 0.9));

        let records: Vec<_> = results
            .into_iter()
            .filter_map(|(_, _, r)| r.ok())
            .map(|a| a.metrics)
            .collect();
        assert_eq!(records.len(), 4);
        // the 5-year window is only 60% covered by a 3-year record
        let (valid, invalid) = partition_by_validity(records);
        assert_eq!(valid.len(), 2);
        assert_eq!(invalid.len(), 2);
        assert!(invalid.iter().all(|r| r.analyze_range == 5));
    }
}
