//! Batch analysis: every site in a records CSV, every configured
//! (window, quantile) pair, grouped and written per dataset.

use crate::persist;
use anyhow::Context;
use chrono::NaiveDate;
use hmf_gauge::exclusion::ExclusionList;
use hmf_gauge::record::RecordSet;
use hmf_metrics::assemble::analyze_site_all;
use hmf_metrics::{AnalysisConfig, SiteAnalysis};
use hmf_utils::dates::{parse_date, parse_date_compact};
use log::{error, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// File written next to the dataset directories listing sites that could
/// not be analysed.
pub const EXCLUDED_SITES_FILE: &str = "excluded_sites.txt";

pub struct AnalyzeArgs {
    pub records_csv: String,
    pub output_dir: String,
    pub config: Option<String>,
    pub exclude: Option<String>,
    pub region: String,
    pub reference_end: Option<String>,
}

/// Results of analysing a record set.
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub analyses: Vec<SiteAnalysis>,
    /// Sites with at least one (window, quantile) pair that could not be
    /// analysed
    pub excluded: ExclusionList,
    /// Sites skipped because they were on the input exclusion list
    pub skipped: usize,
}

pub fn load_config(path: Option<&str>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config {path}")),
        None => {
            let config = AnalysisConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

pub fn load_records(path: &str) -> anyhow::Result<RecordSet> {
    let file = File::open(path).with_context(|| format!("Failed to open {path}"))?;
    let records = RecordSet::read_csv(BufReader::new(file))
        .with_context(|| format!("Failed to read records from {path}"))?;
    info!(
        "Loaded {} sites from {} ({} rows dropped)",
        records.site_count(),
        path,
        records.dropped_rows
    );
    Ok(records)
}

fn parse_reference_end(s: &str) -> anyhow::Result<NaiveDate> {
    parse_date(s)
        .or_else(|_| parse_date_compact(s))
        .map_err(|e| anyhow::anyhow!("Invalid reference end date {s}: {e}"))
}

/// Analyse every site not on `skip`. A failing (window, quantile) pair is
/// logged and its site added to the excluded list; the other pairs and
/// sites carry on. Sites the reader found no usable rows for go straight
/// to the excluded list.
pub fn analyze_records(
    records: &RecordSet,
    config: &AnalysisConfig,
    skip: &ExclusionList,
) -> BatchOutput {
    let mut output = BatchOutput::default();

    for site_no in &records.absent_sites {
        if skip.contains(site_no) {
            output.skipped += 1;
            continue;
        }
        warn!("Site {site_no}: no usable discharge records");
        output.excluded.insert(site_no.clone());
    }

    for (site_no, series) in &records.sites {
        if skip.contains(site_no) {
            info!("Skipping excluded site {site_no}");
            output.skipped += 1;
            continue;
        }
        info!("Analysing site {} ({} days)", site_no, series.len());

        for (window_years, quantile, result) in analyze_site_all(series, config) {
            match result {
                Ok(analysis) => output.analyses.push(analysis),
                Err(e) => {
                    warn!("Site {site_no} ({window_years}y, q={quantile}): {e}");
                    output.excluded.insert(site_no.clone());
                }
            }
        }
    }

    output
}

pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(end) = &args.reference_end {
        config.reference_end = parse_reference_end(end)?;
    }

    let skip = match &args.exclude {
        Some(path) => ExclusionList::load(Path::new(path))
            .with_context(|| format!("Failed to read exclusion list {path}"))?,
        None => ExclusionList::default(),
    };
    if !skip.is_empty() {
        info!("{} sites on the exclusion list", skip.len());
    }

    let records = load_records(&args.records_csv)?;
    let output = analyze_records(&records, &config, &skip);
    info!(
        "Analysed {} site/dataset pairs, {} sites excluded, {} skipped",
        output.analyses.len(),
        output.excluded.len(),
        output.skipped
    );

    let output_dir = Path::new(&args.output_dir);
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let groups = persist::group_by_dataset(&args.region, output.analyses);
    let mut failures = 0;
    for group in groups.values() {
        failures += persist::write_group(output_dir, group);
    }

    let excluded_path = output_dir.join(EXCLUDED_SITES_FILE);
    if let Err(e) = std::fs::write(&excluded_path, output.excluded.to_string()) {
        error!("Failed to write {}: {}", excluded_path.display(), e);
        failures += 1;
    }

    if failures > 0 {
        warn!("{failures} output files could not be written");
    }
    info!("Analysis complete. Output: {}", output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        analyze_records, parse_reference_end, run_analyze, AnalyzeArgs, EXCLUDED_SITES_FILE,
    };
    use chrono::{Datelike, Duration, NaiveDate};
    use hmf_gauge::exclusion::ExclusionList;
    use hmf_gauge::record::RecordSet;
    use hmf_metrics::AnalysisConfig;
    use std::fmt::Write;

    fn records_csv() -> String {
        let mut csv = String::from("site_no,datetime,discharge,tidal_discharge\n");
        let start = NaiveDate::from_ymd_opt(2017, 10, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 9, 30).unwrap();
        let mut date = start;
        while date <= end {
            let q = if date.month() == 2 && date.day() < 4 { 900.0 } else { 50.0 };
            writeln!(csv, "01000000,{},{q},", date.format("%Y-%m-%d")).unwrap();
            writeln!(csv, "02000000,{},{q},", date.format("%Y-%m-%d")).unwrap();
            date += Duration::days(1);
        }
        // a site whose only record predates every window
        csv.push_str("03000000,1950-01-01,10.0,\n");
        // a site with nothing usable
        csv.push_str("04000000,2019-10-01,,\n04000000,2019-10-02,Ice,\n");
        csv
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            window_lengths: vec![3],
            quantiles: vec![0.9, 0.95],
            min_record_years: 3,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_analyze_records_excludes_and_skips() {
        let records = RecordSet::read_csv(records_csv().as_bytes()).unwrap();
        let skip = ExclusionList::parse("'02000000'");
        let output = analyze_records(&records, &config(), &skip);

        assert_eq!(output.skipped, 1);
        assert_eq!(output.analyses.len(), 2);
        assert!(output.analyses.iter().all(|a| a.metrics.site_no == "01000000"));
        assert!(output.analyses.iter().all(|a| a.metrics.valid));
        assert_eq!(output.excluded.len(), 2);
        assert!(output.excluded.contains("03000000"));
        assert!(output.excluded.contains("04000000"));
    }

    #[test]
    fn test_reference_end_formats() {
        let expected = NaiveDate::from_ymd_opt(2010, 9, 30).unwrap();
        assert_eq!(parse_reference_end("2010-09-30").unwrap(), expected);
        assert_eq!(parse_reference_end("20100930").unwrap(), expected);
        assert!(parse_reference_end("30/09/2010").is_err());
    }

    #[test]
    fn test_run_analyze_writes_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let records_path = dir.path().join("records.csv");
        std::fs::write(&records_path, records_csv()).unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"window_lengths": [3], "quantiles": [0.9], "min_record_years": 3}"#,
        )
        .unwrap();
        let out = dir.path().join("out");

        run_analyze(&AnalyzeArgs {
            records_csv: records_path.to_string_lossy().into_owned(),
            output_dir: out.to_string_lossy().into_owned(),
            config: Some(config_path.to_string_lossy().into_owned()),
            exclude: None,
            region: "test".into(),
            reference_end: None,
        })
        .unwrap();

        let dataset = out.join("test_3_90");
        assert!(dataset.join("site_metrics.csv").exists());
        assert!(dataset.join("mk_magnitude.csv").exists());
        let metrics = std::fs::read_to_string(dataset.join("site_metrics.csv")).unwrap();
        // header plus two sites
        assert_eq!(metrics.lines().count(), 3);
        let excluded = std::fs::read_to_string(out.join(EXCLUDED_SITES_FILE)).unwrap();
        assert_eq!(excluded, "'03000000', '04000000'");
    }

    #[test]
    fn test_missing_records_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_analyze(&AnalyzeArgs {
            records_csv: dir.path().join("nope.csv").to_string_lossy().into_owned(),
            output_dir: dir.path().to_string_lossy().into_owned(),
            config: None,
            exclude: None,
            region: "test".into(),
            reference_end: None,
        });
        assert!(result.is_err());
    }
}
