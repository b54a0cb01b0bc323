//! Event segmentation: flag days above the threshold, convert the excess to
//! a volume and split the flagged days into runs.
//!
//! Runs are found with a first difference of the flag sequence taken over
//! the whole series. A non-exceeding sentinel day is assumed before the
//! first record so a series that opens above threshold still registers a
//! run start, and because the difference is never reset at a hydrologic
//! year boundary, a run crossing Sep 30 -> Oct 1 stays one event owned by
//! the year it started in. Missing dates are not days of the series, so
//! exceeding records on either side of a gap form one run.

use chrono::NaiveDate;
use hmf_gauge::hydro_year::HydrologicCalendar;
use hmf_gauge::series::DischargeSeries;
use serde::Serialize;

/// One day of the series classified against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HmfDay {
    pub date: NaiveDate,
    pub hydrologic_year: i32,
    pub discharge: f64,
    pub exceeds: bool,
    /// `(discharge - threshold) * seconds_per_day` when exceeding, else 0
    pub excess_volume: f64,
    /// Set on the first day of each run
    pub event_start: bool,
    pub event_id: Option<usize>,
}

/// A maximal run of exceeding days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HmfEvent {
    pub id: usize,
    /// Hydrologic year of the first day
    pub hydrologic_year: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration: u32,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedSeries {
    pub threshold: f64,
    pub days: Vec<HmfDay>,
    pub events: Vec<HmfEvent>,
}

impl SegmentedSeries {
    pub fn hmf_days(&self) -> impl Iterator<Item = &HmfDay> {
        self.days.iter().filter(|day| day.exceeds)
    }

    /// Number of events lasting exactly one day.
    pub fn one_day_peaks(&self) -> usize {
        self.events.iter().filter(|event| event.duration == 1).count()
    }
}

/// Volume above threshold for one day; never negative.
pub fn excess_volume(discharge: f64, threshold: f64, seconds_per_day: f64) -> f64 {
    if discharge > threshold {
        (discharge - threshold) * seconds_per_day
    } else {
        0.0
    }
}

pub fn segment(
    series: &DischargeSeries,
    threshold: f64,
    seconds_per_day: f64,
    calendar: &HydrologicCalendar,
) -> SegmentedSeries {
    let mut days = Vec::with_capacity(series.len());
    let mut events: Vec<HmfEvent> = Vec::new();
    // sentinel non-exceedance day before the first record
    let mut previous = false;

    for flow in series.days() {
        let exceeds = flow.discharge > threshold;
        let event_start = exceeds && !previous;
        let volume = excess_volume(flow.discharge, threshold, seconds_per_day);
        let hydrologic_year = calendar.year_of(&flow.date);

        let event_id = if event_start {
            events.push(HmfEvent {
                id: events.len(),
                hydrologic_year,
                start: flow.date,
                end: flow.date,
                duration: 1,
                volume,
            });
            Some(events.len() - 1)
        } else if exceeds {
            // continuing run, including one that crossed into a new year
            events.last_mut().map(|event| {
                event.end = flow.date;
                event.duration += 1;
                event.volume += volume;
                event.id
            })
        } else {
            None
        };

        days.push(HmfDay {
            date: flow.date,
            hydrologic_year,
            discharge: flow.discharge,
            exceeds,
            excess_volume: volume,
            event_start,
            event_id,
        });
        previous = exceeds;
    }

    SegmentedSeries {
        threshold,
        days,
        events,
    }
}
