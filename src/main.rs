//! CLI entry point for the telemetry rollup job.
//!
//! Reads device samples from the source store, computes hourly maximum
//! temperature, sample counts and distance travelled per device, and writes
//! the three tables to the sink store. Both stores come from the environment
//! (`SOURCE_CS`, `SINK_CS`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use telemetry_rollup::config::JobConfig;
use telemetry_rollup::job::{describe, run_job};
use telemetry_rollup::output::{print_json, print_pretty};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "telemetry_rollup")]
#[command(about = "Hourly per-device rollup of temperature and location telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the source batch and write the three hourly tables
    Run {
        /// Compute and log the tables without contacting the sink
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Report the size of the source batch without aggregating or writing
    Describe,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/telemetry_rollup.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("telemetry_rollup.log"));

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
    let config = JobConfig::from_env().context("Invalid job configuration")?;

    match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => {
            info!(
                source = %config.source,
                sink = %config.sink,
                table = %config.source_table,
                model = %config.distance_model,
                dry_run,
                "ETL starting"
            );
            let aggregates = run_job(&config, dry_run)
                .await
                .context("Rollup run failed")?;

            if dry_run {
                for table in aggregates.tables() {
                    print_pretty(table);
                    print_json(table)?;
                }
            }
        }
        Commands::Describe => {
            let summary = describe(&config)
                .await
                .context("Could not describe source batch")?;
            info!(
                samples = summary.samples,
                devices = summary.devices,
                groups = summary.groups,
                "Source batch"
            );
        }
    }

    Ok(())
}
