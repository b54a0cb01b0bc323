//! Mann-Kendall monotonic trend test with Sen's slope, run on a
//! zero-deflated and a zero-inflated version of each annual metric.

use crate::annual::{AnnualSummary, AnnualTable};
use serde::Serialize;
use statrs::function::erf::{erf_inv, erfc};
use std::f64::consts::SQRT_2;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    #[serde(rename = "increasing")]
    Increasing,
    #[serde(rename = "decreasing")]
    Decreasing,
    #[serde(rename = "no trend")]
    NoTrend,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::NoTrend => "no trend",
        };
        f.pad(s)
    }
}

/// Result of one Mann-Kendall test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MannKendall {
    pub trend: Trend,
    /// Significant at the requested alpha
    pub h: bool,
    pub p: f64,
    /// Normalised test statistic
    pub z: f64,
    /// Kendall's tau
    pub tau: f64,
    pub s: f64,
    pub var_s: f64,
    /// Sen's slope
    pub slope: f64,
    pub intercept: f64,
}

impl MannKendall {
    fn no_trend(s: f64, var_s: f64, slope: f64, intercept: f64) -> Self {
        MannKendall {
            trend: Trend::NoTrend,
            h: false,
            p: 1.0,
            z: 0.0,
            tau: 0.0,
            s,
            var_s,
            slope,
            intercept,
        }
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// S statistic: sum of signs over all ordered pairs.
fn s_statistic(x: &[f64]) -> f64 {
    let mut s = 0.0;
    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            let d = x[j] - x[i];
            if d > 0.0 {
                s += 1.0;
            } else if d < 0.0 {
                s -= 1.0;
            }
        }
    }
    s
}

/// Variance of S with the tie correction.
fn variance_s(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mut sorted = x.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut tie_term = 0.0;
    let mut run = 1.0;
    for i in 1..=sorted.len() {
        if i < sorted.len() && sorted[i] == sorted[i - 1] {
            run += 1.0;
        } else {
            tie_term += run * (run - 1.0) * (2.0 * run + 5.0);
            run = 1.0;
        }
    }
    (n * (n - 1.0) * (2.0 * n + 5.0) - tie_term) / 18.0
}

/// Sen's slope (median pairwise slope) and the intercept
/// `median(x) - median(index) * slope`.
pub fn sens_slope(x: &[f64]) -> (f64, f64) {
    let n = x.len();
    if n < 2 {
        return (0.0, x.first().copied().unwrap_or(0.0));
    }
    let mut slopes = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            slopes.push((x[j] - x[i]) / (j - i) as f64);
        }
    }
    let slope = median(&mut slopes);
    let intercept = median(&mut x.to_vec()) - (n - 1) as f64 / 2.0 * slope;
    (slope, intercept)
}

/// Mann-Kendall test of a time-ordered series.
pub fn mann_kendall(x: &[f64], alpha: f64) -> MannKendall {
    let n = x.len();
    let (slope, intercept) = sens_slope(x);
    if n < 2 {
        return MannKendall::no_trend(0.0, 0.0, slope, intercept);
    }

    let s = s_statistic(x);
    let var_s = variance_s(x);
    let z = if s > 0.0 && var_s > 0.0 {
        (s - 1.0) / var_s.sqrt()
    } else if s < 0.0 && var_s > 0.0 {
        (s + 1.0) / var_s.sqrt()
    } else {
        0.0
    };

    // two-sided p from the standard normal: 2 * (1 - cdf(|z|))
    let p = erfc(z.abs() / SQRT_2);
    // critical value ppf(1 - alpha / 2)
    let critical = SQRT_2 * erf_inv(1.0 - alpha);
    let h = z.abs() > critical;
    let trend = if h && z > 0.0 {
        Trend::Increasing
    } else if h && z < 0.0 {
        Trend::Decreasing
    } else {
        Trend::NoTrend
    };

    MannKendall {
        trend,
        h,
        p,
        z,
        tau: s / (0.5 * n as f64 * (n as f64 - 1.0)),
        s,
        var_s,
        slope,
        intercept,
    }
}

/// The annual metrics that get a trend test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TrendMetric {
    Magnitude,
    Duration,
    IntraAnnual,
    EventMagnitude,
    EventDuration,
    Timing,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 6] = [
        TrendMetric::Magnitude,
        TrendMetric::Duration,
        TrendMetric::IntraAnnual,
        TrendMetric::EventMagnitude,
        TrendMetric::EventDuration,
        TrendMetric::Timing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TrendMetric::Magnitude => "magnitude",
            TrendMetric::Duration => "duration",
            TrendMetric::IntraAnnual => "intra_annual",
            TrendMetric::EventMagnitude => "event_magnitude",
            TrendMetric::EventDuration => "event_duration",
            TrendMetric::Timing => "timing",
        }
    }

    pub fn value(&self, row: &AnnualSummary) -> f64 {
        match self {
            TrendMetric::Magnitude => row.hmf_volume,
            TrendMetric::Duration => row.hmf_days as f64,
            TrendMetric::IntraAnnual => row.events as f64,
            TrendMetric::EventMagnitude => row.event_volume,
            TrendMetric::EventDuration => row.event_duration,
            TrendMetric::Timing => row.timing,
        }
    }

    /// Every year's value, zeros included.
    pub fn zero_inflated(&self, table: &AnnualTable) -> Vec<f64> {
        table.years.iter().map(|row| self.value(row)).collect()
    }

    /// Only the years with a nonzero value.
    pub fn zero_deflated(&self, table: &AnnualTable) -> Vec<f64> {
        table
            .years
            .iter()
            .map(|row| self.value(row))
            .filter(|v| *v != 0.0)
            .collect()
    }
}

impl fmt::Display for TrendMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Both trend variants for one metric of one site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPair {
    pub zero_deflated: MannKendall,
    pub zero_inflated: MannKendall,
}

pub fn trend_pair(metric: TrendMetric, table: &AnnualTable, alpha: f64) -> TrendPair {
    TrendPair {
        zero_deflated: mann_kendall(&metric.zero_deflated(table), alpha),
        zero_inflated: mann_kendall(&metric.zero_inflated(table), alpha),
    }
}

/// A trend pair flattened into one output row. Zero-deflated columns carry
/// the `_zd` suffix; zero-inflated columns are unsuffixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub site_no: String,
    #[serde(rename = "dataset_ID")]
    pub dataset_id: f64,
    pub metric: &'static str,
    pub trend_zd: Trend,
    pub h_zd: bool,
    pub p_zd: f64,
    pub z_zd: f64,
    pub tau_zd: f64,
    pub s_zd: f64,
    pub var_s_zd: f64,
    pub slope_zd: f64,
    pub int_zd: f64,
    pub trend: Trend,
    pub h: bool,
    pub p: f64,
    pub z: f64,
    pub tau: f64,
    pub s: f64,
    pub var_s: f64,
    pub slope: f64,
    pub int: f64,
}

impl TrendRow {
    pub fn new(site_no: &str, dataset_id: f64, metric: TrendMetric, pair: &TrendPair) -> Self {
        let zd = &pair.zero_deflated;
        let zi = &pair.zero_inflated;
        TrendRow {
            site_no: site_no.to_string(),
            dataset_id,
            metric: metric.name(),
            trend_zd: zd.trend,
            h_zd: zd.h,
            p_zd: zd.p,
            z_zd: zd.z,
            tau_zd: zd.tau,
            s_zd: zd.s,
            var_s_zd: zd.var_s,
            slope_zd: zd.slope,
            int_zd: zd.intercept,
            trend: zi.trend,
            h: zi.h,
            p: zi.p,
            z: zi.z,
            tau: zi.tau,
            s: zi.s,
            var_s: zi.var_s,
            slope: zi.slope,
            int: zi.intercept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{mann_kendall, sens_slope, trend_pair, Trend, TrendMetric, TrendRow};
    use crate::annual::{AnnualSummary, AnnualTable};

    #[test]
    fn test_constant_series_has_no_trend() {
        let result = mann_kendall(&[4.0; 12], 0.05);
        assert_eq!(result.trend, Trend::NoTrend);
        assert!(!result.h);
        assert!((result.p - 1.0).abs() < 1e-12);
        assert_eq!(result.s, 0.0);
        assert_eq!(result.var_s, 0.0);
        assert_eq!(result.slope, 0.0);
        assert_eq!(result.intercept, 4.0);
    }

    #[test]
    fn test_strictly_increasing_series() {
        let x: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let result = mann_kendall(&x, 0.05);
        assert_eq!(result.s, 45.0);
        assert_eq!(result.var_s, 125.0);
        assert!((result.z - 44.0 / 125f64.sqrt()).abs() < 1e-12);
        assert_eq!(result.tau, 1.0);
        assert_eq!(result.trend, Trend::Increasing);
        assert!(result.h);
        assert!(result.p < 1e-3);
        assert_eq!(result.slope, 1.0);
        assert_eq!(result.intercept, 1.0);
    }

    #[test]
    fn test_decreasing_series_with_ties() {
        let x = [9.0, 9.0, 8.0, 7.0, 7.0, 5.0, 4.0, 4.0, 2.0, 1.0];
        let result = mann_kendall(&x, 0.05);
        assert!(result.s < 0.0);
        // three tied pairs: each contributes 2 * 1 * 9 = 18 to the tie term
        assert_eq!(result.var_s, (10.0 * 9.0 * 25.0 - 3.0 * 18.0) / 18.0);
        assert_eq!(result.trend, Trend::Decreasing);
        assert!(result.slope < 0.0);
    }

    #[test]
    fn test_short_series() {
        let empty = mann_kendall(&[], 0.05);
        assert_eq!(empty.trend, Trend::NoTrend);
        assert_eq!(empty.p, 1.0);
        let single = mann_kendall(&[3.0], 0.05);
        assert_eq!(single.intercept, 3.0);
        assert_eq!(sens_slope(&[1.0, 3.0]), (2.0, 1.0));
    }

    #[test]
    fn test_zero_deflated_drops_zero_years() {
        let row = |year: i32, events: u32| AnnualSummary {
            year,
            hmf_volume: events as f64,
            hmf_days: events,
            events,
            event_volume: 1.0,
            event_duration: 1.0,
            timing: 0.0,
        };
        let table = AnnualTable {
            years: vec![row(2000, 1), row(2001, 0), row(2002, 3), row(2003, 0)],
            ..AnnualTable::default()
        };
        assert_eq!(TrendMetric::IntraAnnual.zero_inflated(&table), vec![1.0, 0.0, 3.0, 0.0]);
        assert_eq!(TrendMetric::IntraAnnual.zero_deflated(&table), vec![1.0, 3.0]);
        assert!(TrendMetric::Timing.zero_deflated(&table).is_empty());

        let pair = trend_pair(TrendMetric::Timing, &table, 0.05);
        assert_eq!(pair.zero_deflated.trend, Trend::NoTrend);
        let row = TrendRow::new("11447650", 27.0, TrendMetric::Timing, &pair);
        assert_eq!(row.metric, "timing");
        assert_eq!(row.p_zd, 1.0);
    }
}
