//! seriesguard - flag metrics whose latest daily value is anomalous
//!
//! Reads the configured CSV feeds (local files or http(s) URLs), writes
//! forecast/error tables to the output directory and reports the verdicts
//! through the log.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seriesguard::io::{
    CsvArtifactSink, CsvFileSource, HttpSource, LocatorSource, LoggingNotifier,
};
use seriesguard::{Detector, DetectorConfig, ScoringMode};

/// seriesguard CLI
#[derive(Parser)]
#[command(name = "seriesguard")]
#[command(about = "Detect anomalies in the latest observation of daily series", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (YAML, or TOML with a .toml extension)
    #[arg(short, long, env = "SERIESGUARD_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Override output.path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the scoring mode (forecast-error, moving-band)
    #[arg(short, long)]
    mode: Option<ScoringMode>,

    /// Directory that relative input locators are resolved against
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "SERIESGUARD_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; `log` records from the library are forwarded
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match DetectorConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(output) = cli.output {
        config.output.path = output;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    let detector = match Detector::new(config) {
        Ok(detector) => detector,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let files = match cli.data_dir {
        Some(dir) => CsvFileSource::with_base_dir(dir),
        None => CsvFileSource::new(),
    };
    let http = match HttpSource::new() {
        Ok(http) => http,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let source = LocatorSource::new(files, http);
    let sink = CsvArtifactSink::new(&detector.config().output.path);
    let notifier = match &detector.config().email {
        Some(email) => LoggingNotifier::from_email(email),
        None => LoggingNotifier::new("seriesguard"),
    };

    let run = detector.run(&source, &sink, &notifier);
    if run.verdicts.is_empty() && !run.failures.is_empty() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
