use crate::error::{GaugeError, Result};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::mem::replace;

/// A date range iterator that yields each date from the start date
/// through the end date (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 > self.1 {
            return None;
        }
        match self.0.succ_opt() {
            Some(next) => Some(replace(&mut self.0, next)),
            None => {
                // end of the representable calendar; yield once more then stop
                let current = self.0;
                self.1 = NaiveDate::MIN;
                Some(current)
            }
        }
    }
}

/// The period over which a site is evaluated, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(GaugeError::InvalidWindow { start, end });
        }
        Ok(AnalysisWindow { start, end })
    }

    /// The `years`-long window ending on `end`, e.g. 30 years ending
    /// 2020-09-30 starts on 1990-10-01.
    pub fn trailing_years(end: NaiveDate, years: u32) -> Result<Self> {
        let start = end
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .and_then(|d| d.succ_opt())
            .ok_or(GaugeError::WindowOutOfRange { years, end })?;
        AnalysisWindow::new(start.min(end), end)
    }

    /// Number of calendar days in the window, both ends counted.
    pub fn expected_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.start <= *date && *date <= self.end
    }

    /// Iterate every calendar day in the window.
    pub fn days(&self) -> DateRange {
        DateRange(self.start, self.end)
    }
}
