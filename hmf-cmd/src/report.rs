//! Console report of one site's metrics.

use crate::analyze::{load_config, load_records};
use hmf_gauge::series::DischargeSeries;
use hmf_metrics::assemble::analyze_site_all;
use hmf_metrics::{AnalysisConfig, SiteAnalysis};
use hmf_utils::dates::format_date;
use log::warn;
use std::fmt::Write;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn write_analysis(out: &mut String, analysis: &SiteAnalysis) -> std::fmt::Result {
    let m = &analysis.metrics;
    writeln!(
        out,
        "== {}y window ({} to {}), q={} [dataset {}]",
        m.analyze_range,
        format_date(&m.window_start),
        format_date(&m.window_end),
        m.quantile,
        m.dataset_id
    )?;
    writeln!(
        out,
        "  valid: {}  missing: {:.2}%  threshold: {:.2}",
        m.valid,
        m.missing_fraction * 100.0,
        m.threshold
    )?;
    writeln!(
        out,
        "  hmf years: {}  inter-annual: {:.1}%  intra-annual: {:.2} events/yr  one-day peaks: {}",
        m.hmf_years, m.inter_annual, m.intra_annual, m.one_day_peaks
    )?;
    writeln!(
        out,
        "  annual hmf: {:.6} km3  annual duration: {:.1} d",
        m.annual_hmf, m.annual_duration
    )?;
    writeln!(
        out,
        "  event hmf: {:.6} km3  event duration: {:.1} d  timing: day {:.1}",
        m.event_hmf, m.event_duration, m.timing
    )?;
    writeln!(
        out,
        "  3-month hmf: {:.6} km3  6-month hmf: {:.6} km3",
        m.three_mo_hmf, m.six_mo_hmf
    )?;
    let monthly: Vec<String> = MONTHS
        .iter()
        .zip(m.monthly())
        .map(|(name, value)| format!("{name} {value:.6}"))
        .collect();
    writeln!(out, "  monthly: {}", monthly.join(", "))?;
    if let Some(longest) = analysis.events.iter().max_by_key(|event| event.duration) {
        writeln!(
            out,
            "  events: {}  longest: {} d from {}",
            analysis.events.len(),
            longest.duration,
            format_date(&longest.start)
        )?;
    }
    if analysis.trends.is_empty() {
        writeln!(out, "  trends: skipped (invalid site)")?;
    }
    for row in &analysis.trends {
        writeln!(
            out,
            "  trend {:<16} {:<10} p={:.3} slope={:.3e} | zero-deflated {:<10} p={:.3}",
            row.metric, row.trend, row.p, row.slope, row.trend_zd, row.p_zd
        )?;
    }
    Ok(())
}

/// Render the report for every configured (window, quantile) pair.
/// Pairs that cannot be analysed appear as a one-line note.
pub fn site_report(series: &DischargeSeries, config: &AnalysisConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Site {} ({} days of record)",
        series.site_no(),
        series.len()
    );
    for (window_years, quantile, result) in analyze_site_all(series, config) {
        let written = match result {
            Ok(analysis) => write_analysis(&mut out, &analysis),
            Err(e) => {
                warn!("Site {} ({}y, q={}): {}", series.site_no(), window_years, quantile, e);
                writeln!(out, "== {window_years}y window, q={quantile}: {e}")
            }
        };
        if written.is_err() {
            break;
        }
    }
    out
}

pub fn run_site_report(records_csv: &str, site: &str, config: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let records = load_records(records_csv)?;
    let series = records
        .site(site)
        .ok_or_else(|| anyhow::anyhow!("Site {site} not found in {records_csv}"))?;
    print!("{}", site_report(series, &config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::site_report;
    use chrono::{Duration, NaiveDate};
    use hmf_gauge::series::{DailyFlow, DischargeSeries};
    use hmf_metrics::AnalysisConfig;

    #[test]
    fn test_report_lists_every_combination() {
        let config = AnalysisConfig {
            window_lengths: vec![1, 2],
            quantiles: vec![0.9],
            min_record_years: 1,
            ..AnalysisConfig::default()
        };
        // only the last year of the two-year window has records, so that
        // window is invalid
        let start = NaiveDate::from_ymd_opt(2019, 10, 1).unwrap();
        let days = (0..366)
            .map(|i| DailyFlow::new(start + Duration::days(i), if i == 100 { 80.0 } else { 2.0 }))
            .collect();
        let report = site_report(&DischargeSeries::new("11447650", days), &config);

        assert!(report.starts_with("Site 11447650 (366 days of record)"));
        assert!(report.contains("== 1y window (2019-10-01 to 2020-09-30), q=0.9 [dataset 0.9]"));
        assert!(report.contains("== 2y window (2018-10-01 to 2020-09-30)"));
        assert!(report.contains("one-day peaks: 1"));
        assert!(report.contains("events: 1  longest: 1 d from 2020-01-09"));
        assert_eq!(report.matches("trend magnitude").count(), 1);
        assert_eq!(report.matches("trends: skipped (invalid site)").count(), 1);
    }

    #[test]
    fn test_report_notes_absent_windows() {
        let config = AnalysisConfig {
            window_lengths: vec![5],
            quantiles: vec![0.9],
            ..AnalysisConfig::default()
        };
        let old = NaiveDate::from_ymd_opt(1960, 1, 1).unwrap();
        let series = DischargeSeries::new("x", vec![DailyFlow::new(old, 1.0)]);
        let report = site_report(&series, &config);
        assert!(report.contains("== 5y window, q=0.9: No discharge records for site x"));
    }
}
