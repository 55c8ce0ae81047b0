use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use minimal_log::{LogConfig, LogEvent, MinimalLog};

/// Demonstrate the logger, optionally cleaning up log files afterwards
#[derive(Parser, Debug)]
#[command(name = "minimal-log-demo", version)]
struct Cli {
    /// TOML config file (defaults to ~/.minimal-log/config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delete log files below the current directory when done
    #[arg(long)]
    clean: bool,

    /// Skip the demonstration events
    #[arg(long)]
    no_demo: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LogConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LogConfig::load().context("Failed to load default config")?,
    };

    let logger = MinimalLog::new(Some("minimal_log_demo"), config);

    if !cli.no_demo {
        demo(&logger);
    }

    if cli.clean {
        let report = logger.clean_up().context("Failed to clean up log files")?;
        println!(
            "removed {} log file(s), {} problem(s)",
            report.deleted_count(),
            report.problems().count()
        );
    }

    Ok(())
}

fn demo(logger: &MinimalLog) {
    logger.announce("running demonstration");
    logger.log_event(LogEvent::info("loading demo data").completed(false));
    load_data(logger);
    logger.log_event(LogEvent::info("loading demo data").completed(true));
    logger.log_event(LogEvent::warning(format!("{} retries left", 2)));
}

#[inline(never)]
fn load_data(logger: &MinimalLog) {
    parse_record(logger, "id=7;name=");
}

#[inline(never)]
fn parse_record(logger: &MinimalLog, record: &str) {
    if record.ends_with('=') {
        logger.error(format!("record '{}' has an empty field", record));
    }
}
