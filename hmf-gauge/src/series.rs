use crate::window::AnalysisWindow;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One day of mean discharge at a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyFlow {
    pub date: NaiveDate,
    pub discharge: f64,
}

impl DailyFlow {
    pub fn new(date: NaiveDate, discharge: f64) -> Self {
        DailyFlow { date, discharge }
    }
}

/// A single site's daily discharge, sorted by date with at most one value
/// per date. Missing dates stay missing; nothing is filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct DischargeSeries {
    site_no: String,
    days: Vec<DailyFlow>,
}

impl DischargeSeries {
    /// Build a series, sorting by date and keeping the first value seen for
    /// any repeated date.
    pub fn new(site_no: impl Into<String>, mut days: Vec<DailyFlow>) -> Self {
        days.sort_by_key(|day| day.date);
        days.dedup_by_key(|day| day.date);
        DischargeSeries {
            site_no: site_no.into(),
            days,
        }
    }

    pub fn site_no(&self) -> &str {
        &self.site_no
    }

    pub fn days(&self) -> &[DailyFlow] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|day| day.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|day| day.date)
    }

    pub fn discharges(&self) -> impl Iterator<Item = f64> + '_ {
        self.days.iter().map(|day| day.discharge)
    }

    /// The part of the series inside the window.
    pub fn within(&self, window: &AnalysisWindow) -> DischargeSeries {
        let days = self
            .days
            .iter()
            .filter(|day| window.contains(&day.date))
            .copied()
            .collect();
        DischargeSeries {
            site_no: self.site_no.clone(),
            days,
        }
    }

    /// Whether the record spans at least `years` full years from its first
    /// to its last day.
    pub fn spans_years(&self, years: u32) -> bool {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => first
                .checked_add_months(Months::new(years.saturating_mul(12)))
                .map(|needed_end| last.succ_opt().unwrap_or(last) >= needed_end)
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Combine a primary and a tidally-filtered discharge signal: for any date
/// present in both, the tidal value wins; otherwise whichever exists is used.
pub fn merge_tidal(primary: &[DailyFlow], tidal: &[DailyFlow]) -> Vec<DailyFlow> {
    let mut merged: BTreeMap<NaiveDate, f64> = primary
        .iter()
        .map(|day| (day.date, day.discharge))
        .collect();
    for day in tidal {
        merged.insert(day.date, day.discharge);
    }
    merged
        .into_iter()
        .map(|(date, discharge)| DailyFlow { date, discharge })
        .collect()
}
