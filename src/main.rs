//! CLI entry point for the AQI rollup tool.
//!
//! Provides subcommands for scoring a single reading, running the
//! city → region → country rollup over a batch of captures, and ranking the
//! most polluted locations of the latest cycle.

mod infra;
mod services;

use anyhow::{Result, bail};
use aqi_rollup::aqi::ScaleScheme;
use aqi_rollup::leaderboard::{RankFilter, rank};
use aqi_rollup::output::{append_records, print_json, write_json};
use aqi_rollup::parser::parse_pollutants;
use aqi_rollup::rollup::{Level, RollupResult};
use aqi_rollup::{AqiConfig, compute_index, run_cycles};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::infra::local::{CsvMetadataSource, FileReadingSource};
use crate::services::sources::{MetadataSource, ReadingSource};

#[derive(Parser)]
#[command(name = "aqi_rollup")]
#[command(about = "Compute air-quality indices and roll them up by city, region and country", long_about = None)]
struct Cli {
    /// Severity scale applied at every level
    #[arg(long, global = true, env = "AQI_SCALE_SCHEME", default_value = "six-level")]
    scheme: ScaleScheme,

    /// JSON file overriding breakpoint tables per pollutant
    #[arg(long, global = true, env = "AQI_BREAKPOINTS")]
    breakpoints: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the index of one reading given as JSON, e.g. '{"pm2_5": 35}'
    Compute {
        #[arg(value_name = "READING_JSON")]
        reading: String,
    },
    /// Run every ingestion cycle in a capture file and write the records
    Rollup {
        /// JSON capture file (optionally .gz)
        #[arg(short, long)]
        readings: PathBuf,

        /// Directory containing cities.csv, states.csv and countries.csv
        #[arg(short, long, default_value = "data")]
        metadata_dir: PathBuf,

        /// Directory to append record CSVs and write cycle reports to
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,

        /// Gzip the JSON cycle reports
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Rank the most polluted locations of the latest cycle
    Leaderboard {
        #[arg(short, long)]
        readings: PathBuf,

        #[arg(short, long, default_value = "data")]
        metadata_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = BoardLevel::City)]
        level: BoardLevel,

        /// Only rank locations in this country
        #[arg(long)]
        country: Option<String>,

        /// Only rank locations in this region
        #[arg(long)]
        region: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BoardLevel {
    City,
    Region,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/aqi_rollup.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aqi_rollup.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AqiConfig::load(cli.scheme, cli.breakpoints.as_deref())?;

    match cli.command {
        Commands::Compute { reading } => {
            let reading = parse_pollutants(&reading)?;
            match compute_index(&reading, &config) {
                Some(result) => {
                    info!(
                        aqi = result.index,
                        governing = %result.governing,
                        scale = result.scale,
                        category = result.category(config.scheme),
                        "Index computed"
                    );
                    print_json(&result)?;
                }
                None => warn!("Insufficient data: no pollutant produced a sub-index"),
            }
        }
        Commands::Rollup {
            readings,
            metadata_dir,
            output_dir,
            gzip,
        } => {
            let cycles = load_and_roll_up(&readings, &metadata_dir, config).await?;
            write_cycles(&output_dir, &cycles, gzip)?;
        }
        Commands::Leaderboard {
            readings,
            metadata_dir,
            level,
            country,
            region,
            page,
            limit,
        } => {
            let scheme = config.scheme;
            let cycles = load_and_roll_up(&readings, &metadata_dir, config).await?;
            let Some(latest) = cycles.iter().rev().find_map(|(_, r)| r.as_ref().ok()) else {
                bail!("no cycle produced any records");
            };

            let (records, level) = match level {
                BoardLevel::City => (&latest.cities, Level::City),
                BoardLevel::Region => (&latest.regions, Level::Region),
            };
            let filter = RankFilter {
                level: Some(level),
                country,
                region,
                page,
                limit,
                ..Default::default()
            };

            info!(timestamp = %latest.timestamp(), "Ranking latest cycle");
            print_json(&rank(records, &filter, scheme))?;
        }
    }

    Ok(())
}

/// Loads readings and metadata, then runs every cycle on the blocking pool.
#[tracing::instrument(skip_all, fields(readings = %readings.display(), metadata_dir = %metadata_dir.display()))]
async fn load_and_roll_up(
    readings: &Path,
    metadata_dir: &Path,
    config: AqiConfig,
) -> Result<Vec<(chrono::DateTime<chrono::Utc>, aqi_rollup::Result<RollupResult>)>> {
    let raw = FileReadingSource::new(readings).load_readings().await?;
    let metadata = CsvMetadataSource::new(metadata_dir).load_metadata().await?;

    let cycles = tokio::task::spawn_blocking(move || run_cycles(&raw, &metadata, &config)).await?;
    Ok(cycles)
}

/// Appends each successful cycle's records to per-level CSVs and writes a
/// JSON report per cycle. Fails only if every cycle failed.
fn write_cycles(
    output_dir: &Path,
    cycles: &[(chrono::DateTime<chrono::Utc>, aqi_rollup::Result<RollupResult>)],
    gzip: bool,
) -> Result<()> {
    let reports_dir = output_dir.join("reports");
    std::fs::create_dir_all(&reports_dir)?;

    let mut succeeded = 0;
    for (timestamp, outcome) in cycles {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(timestamp = %timestamp, error = %e, "Cycle failed, nothing written");
                continue;
            }
        };

        append_records(&output_dir.join("cities.csv"), &result.cities)?;
        append_records(&output_dir.join("regions.csv"), &result.regions)?;
        append_records(&output_dir.join("countries.csv"), &result.countries)?;

        let name = format!(
            "cycle={}.json{}",
            timestamp.format("%Y-%m-%dT%H-%M-%SZ"),
            if gzip { ".gz" } else { "" }
        );
        write_json(&reports_dir.join(name), &result.report, gzip)?;

        info!(
            timestamp = %timestamp,
            cities = result.report.cities.succeeded,
            regions = result.report.regions.succeeded,
            countries = result.report.countries.succeeded,
            failed = result.failed_count(),
            "Cycle written"
        );
        succeeded += 1;
    }

    if succeeded == 0 {
        bail!("all {} cycles failed", cycles.len());
    }

    info!(output_dir = %output_dir.display(), cycles = succeeded, "Finished writing rollup output");
    Ok(())
}
