use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use natal_core::TopicKey;

#[derive(Parser)]
#[command(name = "natal")]
#[command(version)]
#[command(about = "Chart-grounded conversation context for an astrology assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default configuration to ~/.natal/config.json
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Import a precomputed chart as a subject's new chart generation
    Import {
        #[arg(short, long)]
        subject: String,
        /// Path to the chart JSON
        #[arg(short, long)]
        chart: PathBuf,
        /// Birth instant (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_instant)]
        born: DateTime<Utc>,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },

    /// Resolve topic keys to summaries or raw chart slices
    Resolve {
        #[arg(short, long)]
        subject: String,
        /// Comma-separated topic keys (planets,houses,navamsa,...)
        #[arg(short, long, value_delimiter = ',', required = true)]
        keys: Vec<TopicKey>,
    },

    /// Show the current period chain, or the periods overlapping a range
    Periods {
        #[arg(short, long)]
        subject: String,
        #[arg(long, value_parser = parse_instant, requires = "to")]
        from: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_instant, requires = "from")]
        to: Option<DateTime<Utc>>,
    },

    /// Assemble context for a turn, print it, then record the exchange
    Turn {
        #[arg(short, long)]
        subject: String,
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        assistant: String,
        #[arg(short, long, value_delimiter = ',')]
        keys: Vec<TopicKey>,
    },

    /// Show the stored chat log, compacted messages included
    History {
        #[arg(short, long)]
        subject: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Compact the conversation window now
    Compact {
        #[arg(short, long)]
        subject: String,
    },

    /// Summarize recorded turn telemetry
    Report,

    /// Show chart, summary and window state for a subject
    Status {
        #[arg(short, long)]
        subject: String,
    },
}

/// RFC 3339 instant or a bare date at midnight UTC
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got {raw:?}"))
}
