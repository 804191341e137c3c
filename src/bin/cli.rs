//! Sitewatch CLI
//!
//! Local and CI entry point. For AWS Lambda, use `sitewatch-lambda`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sitewatch::{
    error::Result,
    models::Config,
    pipeline::{self, Monitor},
    storage,
};

/// Sitewatch - Website Change Monitor
#[derive(Parser, Debug)]
#[command(
    name = "sitewatch",
    version,
    about = "Watches web pages and alerts once per detected change"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every job once
    Run {
        /// Only run the named job (repeatable)
        #[arg(long = "job", value_name = "NAME")]
        jobs: Vec<String>,

        /// Exit with status 1 when any change was detected
        #[arg(long)]
        fail_on_change: bool,

        /// Exit with status 2 when any job failed
        #[arg(long)]
        fail_on_error: bool,
    },

    /// Validate the configuration and job definitions without network access
    Validate,

    /// Show the stored state of every job
    Status,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, default_level: &str) {
    let level = if verbose { "debug" } else { default_level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env();
    Ok(config)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, "info");
            log::error!("Failed to load {}: {}", cli.config.display(), e);
            return ExitCode::from(2);
        }
    };
    init_logging(cli.verbose, &config.logging.level);
    log::debug!("Loaded configuration from {}", cli.config.display());

    let result = match cli.command {
        Command::Run {
            jobs,
            fail_on_change,
            fail_on_error,
        } => run(&config, &jobs, fail_on_change, fail_on_error).await,
        Command::Validate => validate(&config),
        Command::Status => status(&config).await,
    };

    result.unwrap_or_else(|e| {
        log::error!("{}", e);
        ExitCode::from(2)
    })
}

async fn run(
    config: &Config,
    names: &[String],
    fail_on_change: bool,
    fail_on_error: bool,
) -> Result<ExitCode> {
    let specs = pipeline::select_jobs(&config.jobs, names)?;
    if specs.is_empty() {
        log::warn!("No jobs configured in [[jobs]]");
    }

    let monitor = Monitor::from_config(config).await?;
    let summary = monitor.run(&specs).await;

    summary.print();
    if let Err(e) = summary.write_ci_reports() {
        log::warn!("Could not write CI step reports: {}", e);
    }

    if fail_on_error && summary.error_count() > 0 {
        return Ok(ExitCode::from(2));
    }
    if fail_on_change && summary.has_changes() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn validate(config: &Config) -> Result<ExitCode> {
    log::info!("Validating configuration...");
    config.validate()?;
    log::info!("✓ Config OK");

    let mut failures = 0;
    for (spec, prepared) in config.jobs.iter().zip(pipeline::prepare_jobs(&config.jobs)) {
        match prepared {
            Ok(job) => log::info!("✓ {} ({:?}) {}", job.name, job.detector.mode(), job.target),
            Err(e) => {
                failures += 1;
                log::error!("✗ {}: {}", spec.name, e);
            }
        }
    }

    if failures > 0 {
        log::error!("{} of {} job(s) invalid", failures, config.jobs.len());
        return Ok(ExitCode::from(2));
    }
    log::info!("All {} job(s) valid!", config.jobs.len());
    Ok(ExitCode::SUCCESS)
}

async fn status(config: &Config) -> Result<ExitCode> {
    let store = storage::from_config(&config.store).await?;
    log::info!("Store backend: {:?}", config.store.backend);

    for spec in &config.jobs {
        match store.get(&spec.name).await? {
            Some(state) => {
                let observation = match (state.content_digest(), state.pattern_present()) {
                    (Some(digest), _) => format!("checksum {digest}"),
                    (None, Some(present)) => format!("pattern present: {present}"),
                    (None, None) => "unknown".to_string(),
                };
                log::info!(
                    "{}: {} (checked {})",
                    spec.name,
                    observation,
                    state.last_checked_at.to_rfc3339()
                );
            }
            None => log::info!("{}: never checked", spec.name),
        }
    }

    Ok(ExitCode::SUCCESS)
}
