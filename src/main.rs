//! CLI entry point for the Wayback MP3 tool.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cratedigger::download::BarProgress;
use cratedigger::{
    BatchOptions, BatchReport, Downloader, HttpClient, RetryPolicy, Settings, find_mp3_urls,
    logging,
};
use serde::Serialize;
use tracing::{debug, info};

mod cli;

use cli::Args;

/// Exit code when at least one download failed.
const EXIT_PARTIAL_FAILURE: u8 = 2;

#[derive(Serialize)]
struct DiscoveryOutput<'a> {
    page: &'a str,
    urls: &'a [String],
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let settings = resolve_settings(&args)?;
    logging::init(args.verbose, args.quiet, settings.verbosity);
    debug!(?args, ?settings, "CLI arguments resolved");

    let client = HttpClient::try_new_with_timeouts(settings.connect_timeout, settings.read_timeout)
        .context("Failed to build HTTP client")?;

    let urls = find_mp3_urls(&client, &args.url).await?;
    info!(count = urls.len(), "discovery finished");

    if !args.download {
        print_discovery(&args, &urls)?;
        return Ok(ExitCode::SUCCESS);
    }

    if urls.is_empty() {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&BatchReport::default())?);
        } else {
            println!("No MP3 URLs found on the page.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !args.json {
        println!("Found {} potential MP3 URLs (adjusted for Wayback Machine):", urls.len());
        for url in &urls {
            println!("{url}");
        }
        println!(
            "\nDownloading {} MP3 files to: {}",
            urls.len(),
            settings.output_dir.display()
        );
    }

    let progress = if args.quiet || args.json {
        BarProgress::hidden()
    } else {
        BarProgress::new()
    };
    let retry_policy = RetryPolicy::with_max_attempts(settings.max_retries)
        .with_base_delay(settings.retry_base_delay);
    let downloader = Downloader::new(client, retry_policy).with_progress(Arc::new(progress));

    let options = BatchOptions {
        force: args.force,
        ..BatchOptions::default()
    }
    .with_wait(settings.wait);
    let report = downloader
        .download_all(&urls, &settings.output_dir, &options)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.failed() > 0 {
        Ok(ExitCode::from(EXIT_PARTIAL_FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// CLI flags override the config file, which overrides built-in defaults.
fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load()?;
    if let Some(output) = &args.output {
        settings.output_dir.clone_from(output);
    }
    if let Some(retries) = args.retries {
        settings.max_retries = retries;
    }
    if let Some(wait) = args.wait {
        settings.wait = Duration::from_secs_f64(wait);
    }
    Ok(settings)
}

fn print_discovery(args: &Args, urls: &[String]) -> Result<()> {
    if args.json {
        let output = DiscoveryOutput {
            page: &args.url,
            urls,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if urls.is_empty() {
        println!("No MP3 URLs found on the page.");
        return Ok(());
    }

    println!("Found {} potential MP3 URLs (adjusted for Wayback Machine):", urls.len());
    for url in urls {
        println!("{url}");
    }
    println!("\nNote:");
    println!("These URLs have been constructed based on the Wayback Machine timestamp.");
    println!("Please verify if they work correctly.");
    println!("Use --download to save the MP3 files.");
    Ok(())
}

fn print_report(report: &BatchReport) {
    let total = report.len();
    for (i, outcome) in report.outcomes.iter().enumerate() {
        println!("\n[{}/{total}] {}", i + 1, outcome.url);
        match (&outcome.path, &outcome.error) {
            (Some(path), _) if outcome.skipped => {
                println!("✓ Already exists at {}", path.display());
            }
            (Some(path), None) => println!("✓ Saved to {}", path.display()),
            (_, Some(error)) => println!("✗ Failed: {error}"),
            (None, None) => println!("✗ Failed"),
        }
    }
    println!(
        "\nDownload complete: {} successful, {} failed",
        report.successful(),
        report.failed()
    );
}
