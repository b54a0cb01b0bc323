use crate::error::Result;
use crate::series::{merge_tidal, DailyFlow, DischargeSeries};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

/// Date format used in gauge record CSV files: "YYYY-MM-DD"
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A row as it appears in the input CSV:
/// `site_no,datetime,discharge,tidal_discharge`. Either discharge column
/// may be blank or carry a qualifier string (`Ice`, `Eqp`, ...); the tidal
/// column may be absent entirely.
#[derive(Debug, Deserialize)]
struct CsvRow {
    site_no: String,
    datetime: String,
    #[serde(default)]
    discharge: Option<String>,
    #[serde(default)]
    tidal_discharge: Option<String>,
}

/// All sites read from one records file.
#[derive(Debug, Default)]
pub struct RecordSet {
    pub sites: BTreeMap<String, DischargeSeries>,
    /// Sites that appear in the file but have no usable row at all
    pub absent_sites: BTreeSet<String>,
    /// Rows that were malformed or had no usable discharge value
    pub dropped_rows: usize,
}

/// A discharge cell as a measurement. Blanks, qualifier codes and negative
/// provider sentinels all mean "no measurement".
fn usable(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
}

impl RecordSet {
    pub fn site(&self, site_no: &str) -> Option<&DischargeSeries> {
        self.sites.get(site_no)
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Read gauge records from CSV and group them into one series per site.
    /// The tidally-filtered discharge takes priority over the primary value
    /// on dates where both exist.
    ///
    /// A bad row is logged and dropped; only an unreadable header fails
    /// the whole file.
    pub fn read_csv<R: Read>(reader: R) -> Result<RecordSet> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        rdr.headers()?;

        let mut primary: BTreeMap<String, Vec<DailyFlow>> = BTreeMap::new();
        let mut tidal: BTreeMap<String, Vec<DailyFlow>> = BTreeMap::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut dropped_rows = 0usize;

        for result in rdr.deserialize::<CsvRow>() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping malformed row: {e}");
                    dropped_rows += 1;
                    continue;
                }
            };
            if !seen.contains(&row.site_no) {
                seen.insert(row.site_no.clone());
            }
            let date = match NaiveDate::parse_from_str(&row.datetime, DATE_FORMAT) {
                Ok(date) => date,
                Err(e) => {
                    warn!("{}: skipping row with bad date {:?}: {e}", row.site_no, row.datetime);
                    dropped_rows += 1;
                    continue;
                }
            };
            let discharge = usable(row.discharge.as_deref());
            let tidal_discharge = usable(row.tidal_discharge.as_deref());
            if discharge.is_none() && tidal_discharge.is_none() {
                dropped_rows += 1;
                continue;
            }
            if let Some(q) = discharge {
                primary
                    .entry(row.site_no.clone())
                    .or_default()
                    .push(DailyFlow::new(date, q));
            }
            if let Some(q) = tidal_discharge {
                tidal.entry(row.site_no).or_default().push(DailyFlow::new(date, q));
            }
        }

        let mut sites = BTreeMap::new();
        let mut absent_sites = BTreeSet::new();
        for site_no in seen {
            let a = primary.remove(&site_no).unwrap_or_default();
            let b = tidal.remove(&site_no).unwrap_or_default();
            if a.is_empty() && b.is_empty() {
                warn!("{site_no}: no usable discharge values");
                absent_sites.insert(site_no);
                continue;
            }
            if !b.is_empty() {
                debug!("{site_no}: merging {} tidal values over {} primary", b.len(), a.len());
            }
            let series = DischargeSeries::new(site_no.clone(), merge_tidal(&a, &b));
            sites.insert(site_no, series);
        }
        if dropped_rows > 0 {
            warn!("Dropped {dropped_rows} rows without a usable discharge value");
        }
        Ok(RecordSet {
            sites,
            absent_sites,
            dropped_rows,
        })
    }
}
