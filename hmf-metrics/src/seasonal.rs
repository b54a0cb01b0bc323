//! Seasonal windows, the timing (center of mass) statistic and the
//! monthly HMF profile.

use crate::config::AnalysisConfig;
use crate::segment::{HmfDay, SegmentedSeries};
use chrono::Datelike;
use hmf_gauge::hydro_year::{HydrologicCalendar, MonthWindow};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SeasonalAggregates {
    /// HMF volume inside the three-month window per active year
    pub three_month_hmf: f64,
    /// HMF volume inside the six-month window per active year
    pub six_month_hmf: f64,
    /// Mean day of the hydrologic year at which half the annual volume has
    /// passed, over years with any HMF
    pub timing: f64,
    /// Mean HMF volume per month occurrence, January first
    pub monthly: [f64; 12],
}

/// Days whose calendar month falls inside the window.
pub fn restrict_to_window<'a>(
    days: &'a [HmfDay],
    window: &'a MonthWindow,
) -> impl Iterator<Item = &'a HmfDay> + 'a {
    days.iter().filter(move |day| window.contains(&day.date))
}

/// Total HMF volume (reporting unit) inside a month window.
pub fn windowed_volume(
    segmented: &SegmentedSeries,
    window: &MonthWindow,
    config: &AnalysisConfig,
) -> f64 {
    let raw: f64 = restrict_to_window(&segmented.days, window)
        .map(|day| day.excess_volume)
        .sum();
    config.to_reporting_volume(raw)
}

/// For each hydrologic year with nonzero HMF volume, the first
/// day-of-hydrologic-year at which the cumulative volume reaches half of
/// the year's total. Years with no volume are absent from the map.
pub fn yearly_timing(
    segmented: &SegmentedSeries,
    calendar: &HydrologicCalendar,
) -> BTreeMap<i32, u32> {
    let mut timing = BTreeMap::new();
    for (year, days) in calendar.partition(&segmented.days, |day| day.date) {
        let total: f64 = days.iter().map(|day| day.excess_volume).sum();
        if total <= 0.0 {
            continue;
        }
        let half = total / 2.0;
        let mut cumulative = 0.0;
        for day in days {
            cumulative += day.excess_volume;
            if cumulative >= half {
                timing.insert(year, calendar.day_of_year(&day.date));
                break;
            }
        }
    }
    timing
}

/// Mean of the per-year timing values, 0 when no year has HMF.
pub fn mean_timing(timing: &BTreeMap<i32, u32>) -> f64 {
    if timing.is_empty() {
        return 0.0;
    }
    timing.values().map(|day| *day as f64).sum::<f64>() / timing.len() as f64
}

/// Mean HMF volume per occurrence of each calendar month in the record.
/// Every (year, month) present in the series counts, so months without
/// HMF pull the mean down.
pub fn monthly_profile(segmented: &SegmentedSeries, config: &AnalysisConfig) -> [f64; 12] {
    let mut month_totals: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for day in &segmented.days {
        *month_totals
            .entry((day.date.year(), day.date.month()))
            .or_insert(0.0) += day.excess_volume;
    }

    let mut sums = [0.0; 12];
    let mut counts = [0u32; 12];
    for ((_, month), total) in month_totals {
        let index = (month - 1) as usize;
        sums[index] += config.to_reporting_volume(total);
        counts[index] += 1;
    }

    let mut profile = [0.0; 12];
    for (index, value) in profile.iter_mut().enumerate() {
        if counts[index] > 0 {
            *value = sums[index] / counts[index] as f64;
        }
    }
    profile
}

/// `timing_by_year` is the output of [`yearly_timing`] for the same series.
pub fn seasonal_aggregates(
    segmented: &SegmentedSeries,
    timing_by_year: &BTreeMap<i32, u32>,
    config: &AnalysisConfig,
    active_years: u32,
) -> SeasonalAggregates {
    let per_active = |total: f64| {
        if active_years == 0 {
            0.0
        } else {
            total / active_years as f64
        }
    };
    SeasonalAggregates {
        three_month_hmf: per_active(windowed_volume(
            segmented,
            &config.three_month_window,
            config,
        )),
        six_month_hmf: per_active(windowed_volume(segmented, &config.six_month_window, config)),
        timing: mean_timing(timing_by_year),
        monthly: monthly_profile(segmented, config),
    }
}

#[cfg(test)]
mod tests {
    use super::{mean_timing, monthly_profile, seasonal_aggregates, windowed_volume, yearly_timing};
    use crate::config::AnalysisConfig;
    use crate::segment::segment;
    use chrono::{Duration, NaiveDate};
    use hmf_gauge::hydro_year::MonthWindow;
    use hmf_gauge::series::{DailyFlow, DischargeSeries};

    fn unit_config() -> AnalysisConfig {
        AnalysisConfig {
            seconds_per_day: 1.0,
            volume_factor: 1.0,
            ..AnalysisConfig::default()
        }
    }

    fn series_from(start: NaiveDate, values: &[f64]) -> DischargeSeries {
        let days = values
            .iter()
            .enumerate()
            .map(|(i, q)| DailyFlow::new(start + Duration::days(i as i64), *q))
            .collect();
        DischargeSeries::new("test", days)
    }

    #[test]
    fn test_timing_is_first_day_reaching_half() {
        let config = unit_config();
        let calendar = config.calendar();
        let start = NaiveDate::from_ymd_opt(2000, 10, 1).unwrap();
        let mut values = vec![0.0; 365];
        // excess of 1, 1, 2 on days 11, 12, 13 (1-based): half of 4 reached on day 12
        values[10] = 2.0;
        values[11] = 2.0;
        values[12] = 3.0;
        let seg = segment(&series_from(start, &values), 1.0, 1.0, &calendar);
        let timing = yearly_timing(&seg, &calendar);
        assert_eq!(timing.get(&2000), Some(&12));
    }

    #[test]
    fn test_timing_skips_years_without_hmf() {
        let config = unit_config();
        let calendar = config.calendar();
        let start = NaiveDate::from_ymd_opt(2000, 10, 1).unwrap();
        let mut values = vec![0.0; 365 * 3];
        values[0] = 5.0; // 2000: day 1
        values[365 * 2 + 99] = 5.0; // 2002: day 100
        let seg = segment(&series_from(start, &values), 1.0, 1.0, &calendar);
        let timing = yearly_timing(&seg, &calendar);
        assert_eq!(timing.len(), 2);
        assert!(!timing.contains_key(&2001));
        assert_eq!(mean_timing(&timing), (1.0 + 100.0) / 2.0);
        assert_eq!(mean_timing(&Default::default()), 0.0);
    }

    #[test]
    fn test_windowed_volume_wraps_year_end() {
        let config = unit_config();
        let calendar = config.calendar();
        // Nov 30 .. Mar 1 with 2 units of excess every day
        let start = NaiveDate::from_ymd_opt(2000, 11, 30).unwrap();
        let end = NaiveDate::from_ymd_opt(2001, 3, 1).unwrap();
        let n = (end - start).num_days() as usize + 1;
        let seg = segment(&series_from(start, &vec![3.0; n]), 1.0, 1.0, &calendar);

        let winter = MonthWindow::new(12, 2).unwrap();
        // Dec 31 + Jan 31 + Feb 28 days
        assert_eq!(windowed_volume(&seg, &winter, &config), 2.0 * 90.0);

        let agg = seasonal_aggregates(&seg, &yearly_timing(&seg, &calendar), &config, 2);
        assert_eq!(agg.three_month_hmf, 90.0);
        assert_eq!(agg.six_month_hmf, 2.0 * n as f64 / 2.0);
    }

    #[test]
    fn test_no_active_years_gives_zero_seasonal() {
        let config = unit_config();
        let calendar = config.calendar();
        let start = NaiveDate::from_ymd_opt(2000, 10, 1).unwrap();
        let seg = segment(&series_from(start, &[0.0; 400]), 1.0, 1.0, &calendar);
        let agg = seasonal_aggregates(&seg, &yearly_timing(&seg, &calendar), &config, 0);
        assert_eq!(agg.three_month_hmf, 0.0);
        assert_eq!(agg.six_month_hmf, 0.0);
        assert_eq!(agg.timing, 0.0);
        assert_eq!(agg.monthly, [0.0; 12]);
    }

    #[test]
    fn test_monthly_profile_counts_empty_months() {
        let config = unit_config();
        let calendar = config.calendar();
        // January 2001 and January 2002, HMF only in the first
        let start = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        let mut values = vec![0.0; 365 + 31];
        values[0] = 11.0;
        let seg = segment(&series_from(start, &values), 1.0, 1.0, &calendar);
        let profile = monthly_profile(&seg, &config);
        assert_eq!(profile[0], 10.0 / 2.0);
        assert_eq!(profile[1], 0.0);
    }
}
