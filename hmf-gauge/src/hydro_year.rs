use crate::error::{GaugeError, Result};
use chrono::{Datelike, NaiveDate};
use hmf_utils::dates::{
    day_of_hydrologic_year, hydrologic_year_for_date, month_in_window, validate_month,
    DEFAULT_START_MONTH,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// A hydrologic year runs for twelve months from a configured start month
/// (October by default, the USGS water year). Every year-grouping in the
/// metrics engine goes through one of these so aligned and unaligned dates
/// never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HydrologicCalendar {
    start_month: u32,
}

impl Default for HydrologicCalendar {
    fn default() -> Self {
        HydrologicCalendar {
            start_month: DEFAULT_START_MONTH,
        }
    }
}

impl HydrologicCalendar {
    pub fn new(start_month: u32) -> Result<Self> {
        let start_month = validate_month(start_month)
            .map_err(|e| GaugeError::InvalidMonth(e.to_string()))?;
        Ok(HydrologicCalendar { start_month })
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    /// Hydrologic year label of a date.
    pub fn year_of(&self, date: &NaiveDate) -> i32 {
        hydrologic_year_for_date(date, self.start_month)
    }

    /// 1-based day within the hydrologic year.
    pub fn day_of_year(&self, date: &NaiveDate) -> u32 {
        day_of_hydrologic_year(date, self.start_month)
    }

    /// Every hydrologic year label touched by the inclusive date span.
    pub fn years_spanned(&self, first: &NaiveDate, last: &NaiveDate) -> RangeInclusive<i32> {
        self.year_of(first)..=self.year_of(last)
    }

    /// Group items by the hydrologic year of their date, keeping input order
    /// within each year.
    pub fn partition<'a, T, F>(&self, items: &'a [T], date_of: F) -> BTreeMap<i32, Vec<&'a T>>
    where
        F: Fn(&T) -> NaiveDate,
    {
        let mut years: BTreeMap<i32, Vec<&'a T>> = BTreeMap::new();
        for item in items {
            years.entry(self.year_of(&date_of(item))).or_default().push(item);
        }
        years
    }
}

/// An inclusive range of calendar months, wrapping over the year end when
/// `start > end` (e.g. November through April).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthWindow {
    pub start: u32,
    pub end: u32,
}

impl MonthWindow {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        for month in [start, end] {
            validate_month(month).map_err(|e| GaugeError::InvalidMonth(e.to_string()))?;
        }
        Ok(MonthWindow { start, end })
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        month_in_window(date.month(), self.start, self.end)
    }
}
