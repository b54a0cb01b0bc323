//! Shared utility functions for HMF crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{Datelike, NaiveDate};

    /// Month the hydrologic year starts in when nothing else is configured.
    pub const DEFAULT_START_MONTH: u32 = 10;

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Parse a date string in "YYYYMMDD" format
    pub fn parse_date_compact(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y%m%d")?)
    }

    /// Check that a month number is a real calendar month.
    pub fn validate_month(month: u32) -> Result<u32, DateError> {
        if (1..=12).contains(&month) {
            Ok(month)
        } else {
            Err(DateError(format!("month must be 1-12, got {month}")))
        }
    }

    /// Get the hydrologic year label for a date: the calendar year of the
    /// date shifted back by `start_month - 1` months.
    /// e.g. with start month 10, Oct 1 2022 -> 2022, Sep 30 2023 -> 2022
    pub fn hydrologic_year_for_date(date: &NaiveDate, start_month: u32) -> i32 {
        if date.month() >= start_month {
            date.year()
        } else {
            date.year() - 1
        }
    }

    /// First calendar day of the given hydrologic year.
    pub fn hydrologic_year_start(year: i32, start_month: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, start_month, 1)
    }

    /// Get the day-of-hydrologic-year for a date, 1-based.
    /// With start month 10: Oct 1 = day 1, Sep 30 = day 365 (366 in leap years).
    pub fn day_of_hydrologic_year(date: &NaiveDate, start_month: u32) -> u32 {
        let year = hydrologic_year_for_date(date, start_month);
        match hydrologic_year_start(year, start_month) {
            Some(start) => (*date - start).num_days() as u32 + 1,
            None => date.ordinal(),
        }
    }

    /// Whether `month` falls inside the inclusive month window `start..=end`.
    /// A window with `start > end` wraps over the year boundary,
    /// so (11, 4) covers November through April.
    pub fn month_in_window(month: u32, start: u32, end: u32) -> bool {
        if start <= end {
            start <= month && month <= end
        } else {
            month >= start || month <= end
        }
    }

}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
