//! HMF CLI - Command line tool for high-magnitude flow metrics.

use clap::Parser;
use log::debug;

#[derive(Parser)]
#[command(
    name = "hmf-cli",
    version,
    about = "High-magnitude flow metrics for daily streamflow gauges"
)]
struct Cli {
    #[command(subcommand)]
    command: hmf_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("Starting {}", env!("CARGO_PKG_NAME"));
    hmf_cmd::run(cli.command)
}
