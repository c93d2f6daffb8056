//! `seismo`: run the insight engine and inspect its store.
//!
//! # Usage
//!
//! ```
//! seismo run --events feed.json
//! seismo insights --status active --region Luzon
//! seismo --config /etc/seismo.toml status
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use seismo_core::insight::{InsightStatus, InsightType};
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "seismo", version, about = "Seismic insight engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "seismo.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Analyze an event feed and commit the resulting insights.
  Run {
    /// JSON array of raw event records.
    #[arg(long, value_name = "FILE")]
    events: PathBuf,

    /// Run even if the schedule says the next run is not due.
    #[arg(long)]
    force: bool,
  },

  /// Show the engine schedule, counters and insight totals.
  Status,

  /// List insights, most recently updated first.
  Insights {
    #[arg(long)]
    status: Option<InsightStatus>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long = "type")]
    insight_type: Option<InsightType>,

    #[arg(long, default_value_t = 50)]
    limit: usize,
  },

  /// Show one insight's audit trail.
  History { id: Uuid },

  /// Retire an insight.
  Invalidate {
    id: Uuid,

    #[arg(long)]
    reason: String,
  },

  /// Change engine settings stored in the database.
  Configure {
    #[arg(long)]
    enabled: Option<bool>,

    #[arg(long)]
    frequency_hours: Option<u32>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    min_confidence: Option<f64>,
  },

  /// Summarize an event feed without touching the store.
  Stats {
    #[arg(long, value_name = "FILE")]
    events: PathBuf,

    /// Also print a per-day calendar for this year.
    #[arg(long)]
    year: Option<i32>,

    /// Narrow the calendar to one month (1-12).
    #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(cli.config)?;
  commands::dispatch(cli.command, settings).await
}
