use anyhow::{ensure, Result};
use chrono::NaiveDate;
use clap::Parser;
use esta::config::RunConfig;
use esta::pipeline::Pipeline;
use std::path::PathBuf;

/// Hourly gridded emissions inventory processor.
#[derive(Parser)]
#[command(name = "esta", version, about)]
struct Cli {
    /// Path to the TOML run configuration
    config: PathBuf,

    /// Override the first day of the run (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Override the last day of the run (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = RunConfig::load(&cli.config)?;
    if let Some(start) = cli.start {
        config.dates.start = start;
    }
    if let Some(end) = cli.end {
        config.dates.end = end;
    }
    ensure!(
        config.dates.start <= config.dates.end,
        "run start {} is after run end {}",
        config.dates.start,
        config.dates.end
    );

    Pipeline::from_config(config)?.run()
}
