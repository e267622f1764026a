use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use event_calendar::apis::SourceRegistry;
use event_calendar::common::constants::DEFAULT_DAYS_AHEAD;
use event_calendar::config::{AppConfig, LoggingConfig};
use event_calendar::observability::{init_logging, metrics};
use event_calendar::pipeline::Aggregator;
use event_calendar::temporal::{target_offset, DateWindow, Normalizer, RawTemporalInput};

#[derive(Parser)]
#[command(name = "event_calendar")]
#[command(about = "Normalize event listing dates and aggregate listings into one calendar")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize one date/time text and print the result as JSON
    Parse {
        /// Date text as a listing shows it, e.g. "January 14, 2026"
        date_text: String,
        /// Separate time text, e.g. "12:00-1:00pm"
        #[arg(long)]
        time: Option<String>,
        /// Zone to assume when the text names none, e.g. "ET"
        #[arg(long)]
        tz: Option<String>,
        /// Year for dates that omit one; defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
    /// Fetch all configured sources and print the merged listing
    Run {
        /// Config file; defaults to $EVENT_CALENDAR_CONFIG or config.toml
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only run the named source
        #[arg(long)]
        source: Option<String>,
    },
    /// Print the rolling date window
    Window {
        #[arg(long, default_value_t = DEFAULT_DAYS_AHEAD)]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let now = Utc::now().with_timezone(&target_offset());

    match cli.command {
        Commands::Parse { date_text, time, tz, year } => {
            let defaults = LoggingConfig::default();
            let _guard = init_logging("warn", &defaults.directory);

            let mut input = RawTemporalInput::new(date_text, year.unwrap_or_else(|| now.year()));
            input.time_text = time;
            input.timezone_hint = tz;

            let instant = Normalizer::default()
                .normalize(&input)
                .with_context(|| format!("could not normalize '{}'", input.date_text))?;
            println!("{}", serde_json::to_string_pretty(&instant)?);
        }
        Commands::Run { config, source } => {
            let path = config.unwrap_or_else(AppConfig::default_path);
            let config = AppConfig::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            let _guard = init_logging(&config.logging.level, &config.logging.directory);

            let handle = match metrics::init() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "metrics recorder not installed");
                    None
                }
            };

            let mut registry = SourceRegistry::from_config(&config.sources)?;
            if let Some(name) = source {
                registry = match registry.only(&name) {
                    Some(only) => only,
                    None => bail!("unknown source '{}'; configured: {}", name, registry.names().join(", ")),
                };
            }

            let window = config.date_range.window(now)?;
            info!(config = %path.display(), window = %window.describe(), "starting run");

            let report = Aggregator::new(window, config.scraping.max_concurrent)
                .with_reference_year(now.year())
                .run(&registry)
                .await;

            if report.events.is_empty() {
                println!("No events found between {}", window.describe());
            } else {
                println!("{}", report.render_listing());
            }
            println!();
            println!("{}", report.render_status());

            if let (Some(handle), Some(snapshot)) = (&handle, &config.metrics.snapshot_file) {
                metrics::write_snapshot(handle, snapshot)
                    .with_context(|| format!("failed to write metrics snapshot {}", snapshot.display()))?;
            }
        }
        Commands::Window { days } => {
            let window = DateWindow::rolling(now, days)?;
            println!("{}", window.describe());
            println!("{} .. {}", window.start.to_rfc3339(), window.end.to_rfc3339());
        }
    }

    Ok(())
}
