//! Writes analysis results to disk, one directory per dataset.
//!
//! Duplicate sites inside a dataset are dropped here (first occurrence
//! wins). A file that fails to write is logged and the rest are still
//! attempted.

use hmf_metrics::assemble::{partition_by_validity, AnnualRow};
use hmf_metrics::trend::{TrendMetric, TrendRow};
use hmf_metrics::{SiteAnalysis, SiteMetricRecord};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const SITE_METRICS_FILE: &str = "site_metrics.csv";
pub const INVALID_SITES_FILE: &str = "invalid_sites.csv";
pub const ANNUAL_SUMMARY_FILE: &str = "annual_summary.csv";

/// `{region}_{window}_{quantile × 100}`, e.g. `conus_30_90`.
pub fn dataset_dir_name(region: &str, window_years: u32, quantile: f64) -> String {
    format!("{region}_{window_years}_{}", (quantile * 100.0).round() as u32)
}

/// All rows belonging to one dataset.
#[derive(Debug, Default)]
pub struct DatasetGroup {
    pub name: String,
    pub metrics: Vec<SiteMetricRecord>,
    pub annual: Vec<AnnualRow>,
    pub trends: Vec<TrendRow>,
    seen: HashSet<String>,
}

impl DatasetGroup {
    fn new(name: String) -> Self {
        DatasetGroup {
            name,
            ..DatasetGroup::default()
        }
    }

    /// Returns false (and keeps nothing) when the site is already present.
    fn push(&mut self, analysis: SiteAnalysis) -> bool {
        if !self.seen.insert(analysis.metrics.site_no.clone()) {
            return false;
        }
        self.metrics.push(analysis.metrics);
        self.annual.extend(analysis.annual);
        self.trends.extend(analysis.trends);
        true
    }

    pub fn site_count(&self) -> usize {
        self.metrics.len()
    }
}

/// Regroup analyses by dataset, keyed by directory name.
pub fn group_by_dataset(
    region: &str,
    analyses: Vec<SiteAnalysis>,
) -> BTreeMap<String, DatasetGroup> {
    let mut groups: BTreeMap<String, DatasetGroup> = BTreeMap::new();
    for analysis in analyses {
        let name = dataset_dir_name(
            region,
            analysis.metrics.analyze_range,
            analysis.metrics.quantile,
        );
        let site_no = analysis.metrics.site_no.clone();
        let group = groups
            .entry(name.clone())
            .or_insert_with(|| DatasetGroup::new(name));
        if !group.push(analysis) {
            warn!("Dropping duplicate site {} in {}", site_no, group.name);
        }
    }
    groups
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write every table of a group under `output_dir/{group.name}`. Returns
/// the number of files that failed.
pub fn write_group(output_dir: &Path, group: &DatasetGroup) -> usize {
    let dir = output_dir.join(&group.name);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        error!("Failed to create {}: {}", dir.display(), e);
        return 1;
    }

    let (valid, invalid) = partition_by_validity(group.metrics.clone());
    info!(
        "Writing {}: {} valid, {} invalid sites",
        group.name,
        valid.len(),
        invalid.len()
    );

    let mut failures = 0;
    let mut write = |file: &str, result: anyhow::Result<()>| {
        if let Err(e) = result {
            error!("Failed to write {}: {}", dir.join(file).display(), e);
            failures += 1;
        }
    };

    write(SITE_METRICS_FILE, write_csv(&dir.join(SITE_METRICS_FILE), &group.metrics));
    write(INVALID_SITES_FILE, write_csv(&dir.join(INVALID_SITES_FILE), &invalid));
    write(ANNUAL_SUMMARY_FILE, write_csv(&dir.join(ANNUAL_SUMMARY_FILE), &group.annual));
    for metric in TrendMetric::ALL {
        let rows: Vec<&TrendRow> = group
            .trends
            .iter()
            .filter(|row| row.metric == metric.name())
            .collect();
        let file = format!("mk_{}.csv", metric.name());
        write(file.as_str(), write_csv(&dir.join(&file), &rows));
    }
    failures
}
