//! CLI entry point for the Spotify wrapper around `zotify`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cratedigger::convert::{FfmpegTranscoder, conversion_bar, convert_all};
use cratedigger::spotify::library::default_library_dir;
use cratedigger::spotify::{
    AudioQuality, BatchFetchReport, DownloadFormat, FetchOptions, Layout, PlacementReport,
    SpotifyUrl, TransferMode, Zotify, fetch, fetch_batch, read_url_list,
};
use cratedigger::{Settings, logging};
use tracing::debug;

/// Download Spotify tracks, albums and playlists with zotify.
#[derive(Parser, Debug)]
#[command(name = "cratedigger-spotify")]
#[command(author, version, about)]
#[command(after_help = "\
By default files are downloaded as MP3 using zotify's built-in conversion.
  --use-ogg   download as OGG first, then convert to MP3 with ffmpeg
  --keep-ogg  download as OGG and skip MP3 conversion entirely")]
struct Args {
    /// Spotify URL (track, album, or playlist)
    #[arg(required_unless_present_any = ["skip_download", "file"])]
    url: Option<String>,

    /// File containing Spotify URLs (one per line, # for comments)
    #[arg(short, long, conflicts_with = "url")]
    file: Option<PathBuf>,

    /// Target directory [default: spotify_downloads]
    #[arg(short, long)]
    target: Option<PathBuf>,

    /// Seconds zotify waits between tracks (0-3600) [default: 30]
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(0..=3600))]
    wait_time: Option<u64>,

    /// Audio quality in kbps (320, 160 or 96) [default: zotify's setting]
    #[arg(short, long, value_parser = parse_quality)]
    quality: Option<AudioQuality>,

    /// Skip the download and only convert existing OGG files in the target
    #[arg(long)]
    skip_download: bool,

    /// Download as OGG and skip MP3 conversion
    #[arg(long, conflicts_with = "use_ogg")]
    keep_ogg: bool,

    /// Download as OGG, then convert to MP3
    #[arg(long)]
    use_ogg: bool,

    /// Leave the files in zotify's library (copy instead of move)
    #[arg(long)]
    keep_library: bool,

    /// Put every file directly in the target (no artist/album folders)
    #[arg(long)]
    flat_structure: bool,

    /// Remove OGG files after successful conversion to MP3
    #[arg(long)]
    remove_originals: bool,

    /// Show zotify's lyrics lookup errors (hidden by default)
    #[arg(long)]
    show_lyrics_errors: bool,

    /// zotify library directory [default: $HOME/Music/Zotify Music]
    #[arg(long)]
    library: Option<PathBuf>,

    /// zotify executable
    #[arg(long, default_value = "zotify")]
    zotify: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,
}

fn parse_quality(value: &str) -> Result<AudioQuality, String> {
    AudioQuality::from_kbps(value).ok_or_else(|| format!("expected 320, 160 or 96, got '{value}'"))
}

impl Args {
    fn format(&self) -> DownloadFormat {
        if self.keep_ogg || self.use_ogg {
            DownloadFormat::Ogg
        } else {
            DownloadFormat::Mp3
        }
    }

    fn should_convert(&self) -> bool {
        self.use_ogg || (self.skip_download && !self.keep_ogg)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load()?;
    logging::init(args.verbose, args.quiet, settings.verbosity);
    debug!(?args, "CLI arguments parsed");

    let target = args.target.clone().unwrap_or(settings.spotify_target_dir);
    std::fs::create_dir_all(&target)
        .with_context(|| format!("Failed to create target directory '{}'", target.display()))?;

    let mut failed_urls = 0;
    if !args.skip_download {
        let urls = match &args.file {
            Some(file) => {
                let urls = read_url_list(file).await?;
                println!("Loaded {} URLs from {}", urls.len(), file.display());
                urls
            }
            None => vec![SpotifyUrl::parse(args.url.as_deref().unwrap_or_default())?],
        };

        let Some(library) = args.library.clone().or_else(default_library_dir) else {
            bail!("Cannot locate the zotify library (HOME is not set); pass --library");
        };

        let options = FetchOptions {
            bulk_wait_secs: args.wait_time.unwrap_or(settings.bulk_wait_secs),
            format: args.format(),
            quality: args.quality,
            suppress_lyrics_errors: !args.show_lyrics_errors,
            layout: if args.flat_structure {
                Layout::Flat
            } else {
                Layout::Nested
            },
            mode: if args.keep_library {
                TransferMode::Copy
            } else {
                TransferMode::Move
            },
        };
        let zotify = Zotify::new(&args.zotify);

        if let [url] = urls.as_slice()
            && args.file.is_none()
        {
            println!("Content type: {}", url.kind());
            println!("Downloading from: {url}");
            println!("Target directory: {}", target.display());

            let report = fetch(&zotify, url, &library, &target, &options, std::io::stdout())
                .await
                .context("Download failed")?;
            print_placement(&report, &target);
            if !report.is_success() {
                bail!("Failed to place any files in '{}'", target.display());
            }
        } else {
            println!("Target directory: {}", target.display());
            let report =
                fetch_batch(&zotify, &urls, &library, &target, &options, std::io::stdout()).await;
            print_batch(&report, &target);
            failed_urls = report.failed();
        }
    }

    if args.should_convert() {
        convert_target(&target, args.remove_originals, args.quiet).await?;
    }
    if failed_urls > 0 {
        bail!("{failed_urls} URLs failed to download");
    }
    Ok(())
}

fn print_placement(report: &PlacementReport, target: &Path) {
    println!(
        "\nPlaced {} audio files and {} cover images in {}",
        report.audio,
        report.images,
        target.display()
    );
    if report.skipped > 0 {
        println!("Skipped {} files that already existed in the target", report.skipped);
    }
    for (path, error) in &report.failed {
        println!("✗ {}: {error}", path.display());
    }
}

fn print_batch(report: &BatchFetchReport, target: &Path) {
    println!("\nBatch summary:");
    for (url, result) in &report.results {
        match result {
            Ok(placement) if placement.is_success() => println!(
                "✓ {url}: {} audio files, {} cover images",
                placement.audio, placement.images
            ),
            Ok(_) => println!("✗ {url}: nothing placed in {}", target.display()),
            Err(e) => println!("✗ {url}: {e}"),
        }
    }
    println!(
        "Downloaded {} of {} URLs",
        report.results.len() - report.failed(),
        report.results.len()
    );
}

async fn convert_target(target: &Path, remove_originals: bool, quiet: bool) -> Result<()> {
    println!("\nConverting OGG files to MP3...");
    let report = convert_all(
        target,
        &FfmpegTranscoder::new(),
        remove_originals,
        &conversion_bar(quiet),
    )
    .await?;

    if report.total == 0 {
        println!("No unconverted OGG files found!");
        return Ok(());
    }
    println!(
        "Successfully converted {} of {} files",
        report.converted, report.total
    );
    for (path, error) in &report.failed {
        println!("✗ {}: {error}", path.display());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALBUM: &str = "https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy";

    #[test]
    fn test_cli_url_required_unless_skip_download() {
        let err = Args::try_parse_from(["cratedigger-spotify"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let args = Args::try_parse_from(["cratedigger-spotify", "--skip-download"]).unwrap();
        assert!(args.url.is_none());
        assert!(args.should_convert());
    }

    #[test]
    fn test_cli_keep_ogg_conflicts_with_use_ogg() {
        let err = Args::try_parse_from(["cratedigger-spotify", ALBUM, "--keep-ogg", "--use-ogg"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_format_and_conversion_rules() {
        let args = Args::try_parse_from(["cratedigger-spotify", ALBUM]).unwrap();
        assert_eq!(args.format(), DownloadFormat::Mp3);
        assert!(!args.should_convert());

        let args = Args::try_parse_from(["cratedigger-spotify", ALBUM, "--use-ogg"]).unwrap();
        assert_eq!(args.format(), DownloadFormat::Ogg);
        assert!(args.should_convert());

        let args = Args::try_parse_from(["cratedigger-spotify", ALBUM, "--keep-ogg"]).unwrap();
        assert_eq!(args.format(), DownloadFormat::Ogg);
        assert!(!args.should_convert());

        let args =
            Args::try_parse_from(["cratedigger-spotify", "--skip-download", "--keep-ogg"]).unwrap();
        assert!(!args.should_convert());
    }

    #[test]
    fn test_cli_file_replaces_url() {
        let args = Args::try_parse_from(["cratedigger-spotify", "-f", "urls.txt"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("urls.txt")));
        assert!(args.url.is_none());

        let err = Args::try_parse_from(["cratedigger-spotify", ALBUM, "--file", "urls.txt"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_quality_values() {
        let args = Args::try_parse_from(["cratedigger-spotify", ALBUM]).unwrap();
        assert_eq!(args.quality, None);

        let args = Args::try_parse_from(["cratedigger-spotify", ALBUM, "-q", "160"]).unwrap();
        assert_eq!(args.quality, Some(AudioQuality::Kbps160));

        let err = Args::try_parse_from(["cratedigger-spotify", ALBUM, "-q", "128"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_wait_time_range() {
        let args = Args::try_parse_from(["cratedigger-spotify", ALBUM, "-w", "5"]).unwrap();
        assert_eq!(args.wait_time, Some(5));

        let err = Args::try_parse_from(["cratedigger-spotify", ALBUM, "-w", "3601"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
