//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use cratedigger::config::{MAX_RETRIES_LIMIT, MAX_WAIT_SECS};

/// Find and download MP3 files linked from Wayback Machine snapshots.
///
/// Discovery only by default: the URLs found on the archived page are
/// printed. Pass --download to fetch them one at a time.
#[derive(Parser, Debug)]
#[command(name = "cratedigger")]
#[command(author, version, about)]
pub struct Args {
    /// Archived page URL (https://web.archive.org/web/<timestamp>/<original>)
    pub url: String,

    /// Download the discovered MP3 files
    #[arg(short, long)]
    pub download: bool,

    /// Output directory for downloads [default: mp3_downloads]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Attempts per file, including the first (1-20) [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_RETRIES_LIMIT)))]
    pub retries: Option<u32>,

    /// Seconds to wait between downloads, fractional allowed [default: 2]
    #[arg(short, long, value_parser = parse_wait_secs)]
    pub wait: Option<f64>,

    /// Re-download files that already exist
    #[arg(short, long)]
    pub force: bool,

    /// Print results as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_wait_secs(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() || !(0.0..=MAX_WAIT_SECS).contains(&value) {
        return Err(format!("must be between 0 and {MAX_WAIT_SECS}"));
    }
    Ok(value)
}
