//! ffconv - hardcode subtitles into video files
//!
//! Entry point: parses arguments, sets up logging, validates the batch and
//! runs every conversion, exiting non-zero when any of them failed.

use anyhow::Result;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ffconv::cli::Args;
use ffconv::config::Config;
use ffconv::job::ConversionPlan;
use ffconv::workflow::Converter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse_normalized();

    // Held until exit so buffered file logs are flushed
    let guard = setup_logging(args.verbose)?;

    let config = Config::load(args.config.as_deref())?;

    let plan = ConversionPlan::build(args.plan_options(), &config)?;
    info!("Planned {} conversion(s) to .{}", plan.inputs().len(), plan.extension());

    let converter = Converter::new(&config)
        .dry_run(args.dry_run)
        .show_progress(true);
    converter.check_availability().await?;

    let report = converter.run(&plan).await;
    println!("{}", report);

    if !report.all_succeeded() {
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".ffconv").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "ffconv.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console logs go to stderr; stdout carries the summary and dry-run commands
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("ffconv.log").display());

    Ok(guard)
}
