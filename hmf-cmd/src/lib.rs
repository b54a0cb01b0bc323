//! Command implementations for the HMF CLI.
//!
//! Provides a batch analysis over a records CSV and a single-site report.

use clap::Subcommand;

pub mod analyze;
pub mod persist;
pub mod report;

#[derive(Subcommand)]
pub enum Command {
    /// Compute HMF metrics for every site in a records CSV
    Analyze {
        /// Daily records CSV (site_no,datetime,discharge,tidal_discharge)
        #[arg(short = 'r', long)]
        records_csv: String,

        /// Directory that receives one sub-directory per dataset
        #[arg(short = 'o', long)]
        output_dir: String,

        /// JSON analysis configuration; defaults apply when omitted
        #[arg(short = 'c', long)]
        config: Option<String>,

        /// File of gauge ids to skip
        #[arg(short = 'x', long)]
        exclude: Option<String>,

        /// Prefix for the output directories
        #[arg(long, default_value = "conus")]
        region: String,

        /// Override the last day of every analysis window (YYYY-MM-DD or YYYYMMDD)
        #[arg(long)]
        reference_end: Option<String>,
    },

    /// Print the metrics of one site for every window and quantile
    Site {
        /// Daily records CSV (site_no,datetime,discharge,tidal_discharge)
        #[arg(short = 'r', long)]
        records_csv: String,

        /// Gauge id to report on
        #[arg(short = 's', long)]
        site: String,

        /// JSON analysis configuration; defaults apply when omitted
        #[arg(short = 'c', long)]
        config: Option<String>,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Analyze {
            records_csv,
            output_dir,
            config,
            exclude,
            region,
            reference_end,
        } => analyze::run_analyze(&analyze::AnalyzeArgs {
            records_csv,
            output_dir,
            config,
            exclude,
            region,
            reference_end,
        }),
        Command::Site {
            records_csv,
            site,
            config,
        } => report::run_site_report(&records_csv, &site, config.as_deref()),
    }
}
