//! CLI entry point for batch OGG to MP3 conversion.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cratedigger::convert::{
    DEFAULT_QUALITY, FfmpegTranscoder, conversion_bar, convert_all, copy_audio_files,
};
use cratedigger::{Settings, logging};
use tracing::debug;

/// Convert OGG files to MP3 and gather audio files into one directory.
#[derive(Parser, Debug)]
#[command(name = "cratedigger-convert")]
#[command(author, version, about)]
struct Args {
    /// Directory containing audio files (searched recursively)
    directory: PathBuf,

    /// Remove original OGG files after successful conversion
    #[arg(long)]
    remove_originals: bool,

    /// Copy all matching files to this directory (flattened structure)
    #[arg(long)]
    copy_to: Option<PathBuf>,

    /// File extension to copy with --copy-to
    #[arg(long, default_value = ".mp3")]
    extension: String,

    /// ffmpeg VBR quality, 0 (best) to 9
    #[arg(long, default_value_t = DEFAULT_QUALITY, value_parser = clap::value_parser!(u8).range(0..=9))]
    quality: u8,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
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
    let settings = Settings::load()?;
    logging::init(args.verbose, args.quiet, settings.verbosity);
    debug!(?args, "CLI arguments parsed");

    let transcoder = FfmpegTranscoder::new()
        .with_program(&args.ffmpeg)
        .with_quality(args.quality);
    let report = convert_all(
        &args.directory,
        &transcoder,
        args.remove_originals,
        &conversion_bar(args.quiet),
    )
    .await?;

    if report.total == 0 {
        println!("No unconverted OGG files found!");
    } else {
        println!(
            "Conversion complete! Successfully converted {} of {} files.",
            report.converted, report.total
        );
        for (path, error) in &report.failed {
            println!("✗ {}: {error}", path.display());
        }
    }

    if let Some(copy_to) = &args.copy_to {
        println!("\nCopying {} files to {}...", args.extension, copy_to.display());
        let copied = copy_audio_files(&args.directory, copy_to, &args.extension)?;
        println!("Files successfully copied: {copied}");
    }

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}
