//! Per-hydrologic-year tallies and the averages derived from them.
//!
//! Event quantities (days, volume, count) are booked to the year the event
//! started in, so a run crossing the year boundary is counted once, in
//! full, in its start year. Whether a year is *active* is decided by the
//! days themselves: a year with any exceeding day is active even when all
//! of its HMF days belong to a run carried over from the previous year.
//! Averages divide by the number of active years, not by the length of the
//! window; only `inter_annual` uses the window length.

use crate::config::AnalysisConfig;
use crate::segment::SegmentedSeries;
use hmf_gauge::hydro_year::HydrologicCalendar;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualSummary {
    pub year: i32,
    /// Total HMF volume in the reporting unit
    pub hmf_volume: f64,
    pub hmf_days: u32,
    pub events: u32,
    /// Mean volume per event, 0 when the year has no events
    pub event_volume: f64,
    /// Mean event length in days, 0 when the year has no events
    pub event_duration: f64,
    /// Day of the hydrologic year at which half the year's volume had
    /// passed, 0 when the year has no HMF
    pub timing: f64,
}

impl AnnualSummary {
    fn empty(year: i32) -> Self {
        AnnualSummary {
            year,
            hmf_volume: 0.0,
            hmf_days: 0,
            events: 0,
            event_volume: 0.0,
            event_duration: 0.0,
            timing: 0.0,
        }
    }
}

/// One row per hydrologic year from the first to the last record,
/// zero-filled for years with no HMF (or no records at all).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnualTable {
    pub years: Vec<AnnualSummary>,
    /// Hydrologic years containing at least one exceeding day, by each
    /// day's own year
    pub active: BTreeSet<i32>,
}

impl AnnualTable {
    pub fn from_segments(
        segmented: &SegmentedSeries,
        calendar: &HydrologicCalendar,
        config: &AnalysisConfig,
    ) -> Self {
        let (first, last) = match (segmented.days.first(), segmented.days.last()) {
            (Some(first), Some(last)) => (first.date, last.date),
            _ => return AnnualTable::default(),
        };

        let mut rows: BTreeMap<i32, AnnualSummary> = calendar
            .years_spanned(&first, &last)
            .map(|year| (year, AnnualSummary::empty(year)))
            .collect();

        for event in &segmented.events {
            let row = rows
                .entry(event.hydrologic_year)
                .or_insert_with(|| AnnualSummary::empty(event.hydrologic_year));
            row.hmf_volume += config.to_reporting_volume(event.volume);
            row.hmf_days += event.duration;
            row.events += 1;
        }

        for row in rows.values_mut() {
            if row.events > 0 {
                row.event_volume = row.hmf_volume / row.events as f64;
                row.event_duration = row.hmf_days as f64 / row.events as f64;
            }
        }

        let active = segmented.hmf_days().map(|day| day.hydrologic_year).collect();

        AnnualTable {
            years: rows.into_values().collect(),
            active,
        }
    }

    /// Fill in the per-year timing statistic.
    pub fn attach_timing(&mut self, timing: &BTreeMap<i32, u32>) {
        for row in &mut self.years {
            row.timing = timing.get(&row.year).map_or(0.0, |day| *day as f64);
        }
    }

    pub fn active_years(&self) -> u32 {
        self.active.len() as u32
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// Site-level averages over the annual table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AnnualAggregates {
    pub active_years: u32,
    /// Mean HMF volume per active year
    pub annual_hmf: f64,
    /// Mean HMF days per active year
    pub annual_duration: f64,
    /// Mean of the per-year average event length
    pub event_duration: f64,
    /// Mean of the per-year average event volume
    pub event_hmf: f64,
    /// Mean events per active year
    pub intra_annual: f64,
    /// Percentage of the window's years with at least one event, 0..=100
    pub inter_annual: f64,
}

/// `min(100, round(active / window_years, 5) * 100)`
pub fn inter_annual_percent(active_years: u32, window_years: u32) -> f64 {
    if window_years == 0 {
        return 0.0;
    }
    let ratio = ((active_years as f64 / window_years as f64) * 1e5).round() / 1e5;
    (ratio * 100.0).min(100.0)
}

pub fn aggregate(table: &AnnualTable, window_years: u32) -> AnnualAggregates {
    let active_years = table.active_years();
    let per_active = |total: f64| {
        if active_years == 0 {
            0.0
        } else {
            total / active_years as f64
        }
    };
    let sum = |f: fn(&AnnualSummary) -> f64| table.years.iter().map(f).sum::<f64>();

    AnnualAggregates {
        active_years,
        annual_hmf: per_active(sum(|r| r.hmf_volume)),
        annual_duration: per_active(sum(|r| r.hmf_days as f64)),
        event_duration: per_active(sum(|r| r.event_duration)),
        event_hmf: per_active(sum(|r| r.event_volume)),
        intra_annual: per_active(sum(|r| r.events as f64)),
        inter_annual: inter_annual_percent(active_years, window_years),
    }
}
