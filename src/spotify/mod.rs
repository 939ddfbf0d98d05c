//! Spotify downloads through the external `zotify` tool.
//!
//! zotify writes into its own library directory. A fetch snapshots that
//! library, runs zotify with live output, and places the files that
//! appeared (plus cover art) into the requested target directory.
//! [`fetch_batch`] does the same for a list of URLs, one after another.

mod error;
pub mod library;
mod url;
pub mod zotify;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, instrument, warn};

pub use error::SpotifyError;
pub use library::{Layout, NewFiles, PlacementReport, TransferMode};
pub use url::{ContentKind, SpotifyUrl, parse_url_list};
pub use zotify::{AudioQuality, DownloadFormat, OutputRenderer, Zotify};

/// Outcome of every URL in a [`fetch_batch`] run, in input order.
#[derive(Debug, Default)]
pub struct BatchFetchReport {
    /// Each URL with its placement or the error that stopped it.
    pub results: Vec<(SpotifyUrl, Result<PlacementReport, SpotifyError>)>,
}

impl BatchFetchReport {
    /// URLs that errored or placed no audio.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, result)| !result.as_ref().is_ok_and(PlacementReport::is_success))
            .count()
    }
}

/// Options for [`fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Pause zotify takes between tracks.
    pub bulk_wait_secs: u64,
    /// Container zotify should produce.
    pub format: DownloadFormat,
    /// Stream bitrate; `None` keeps zotify's configured quality.
    pub quality: Option<AudioQuality>,
    /// Hide zotify's lyrics lookup errors.
    pub suppress_lyrics_errors: bool,
    /// Flat or nested target layout.
    pub layout: Layout,
    /// Copy (keep the library) or move.
    pub mode: TransferMode,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            bulk_wait_secs: zotify::DEFAULT_BULK_WAIT_SECS,
            format: DownloadFormat::Mp3,
            quality: None,
            suppress_lyrics_errors: true,
            layout: Layout::Nested,
            mode: TransferMode::Move,
        }
    }
}

/// Downloads `url` with zotify and places the new files into `target`.
///
/// zotify's output is rendered to `out` as it arrives.
///
/// # Errors
///
/// Returns [`SpotifyError`] if the target cannot be created, zotify fails,
/// the library directory is missing afterwards, or no new audio appeared.
#[instrument(skip(zotify, options, out), fields(url = %url, target = %target.display()))]
pub async fn fetch<W: Write + Send>(
    zotify: &Zotify,
    url: &SpotifyUrl,
    library_dir: &Path,
    target: &Path,
    options: &FetchOptions,
    out: W,
) -> Result<PlacementReport, SpotifyError> {
    tokio::fs::create_dir_all(target)
        .await
        .map_err(|e| SpotifyError::io(target, e))?;

    let before = library::snapshot(library_dir, &library::AUDIO_EXTENSIONS);
    info!(existing = before.len(), library = %library_dir.display(), "snapshotted zotify library");

    if let Some(count) = zotify.track_count(url).await {
        info!(tracks = count, kind = %url.kind(), "tracks to download");
    }

    let mut renderer = OutputRenderer::new(out, options.suppress_lyrics_errors);
    zotify
        .download(
            url,
            options.bulk_wait_secs,
            options.format,
            options.quality,
            &mut renderer,
        )
        .await?;

    if !library_dir.is_dir() {
        return Err(SpotifyError::LibraryMissing {
            dir: library_dir.to_path_buf(),
        });
    }

    let new_files = library::collect_new(library_dir, &before);
    if new_files.audio.is_empty() {
        return Err(SpotifyError::NoNewFiles {
            dir: library_dir.to_path_buf(),
        });
    }
    info!(
        audio = new_files.audio.len(),
        images = new_files.images.len(),
        "download produced new files"
    );

    Ok(library::place(
        &new_files,
        library_dir,
        target,
        options.layout,
        options.mode,
    ))
}

/// Reads a URL list file (one Spotify URL per line).
///
/// # Errors
///
/// Returns [`SpotifyError::Io`] if the file cannot be read,
/// [`SpotifyError::InvalidUrl`] for a malformed line and
/// [`SpotifyError::EmptyUrlList`] if no URL remains.
pub async fn read_url_list(path: &Path) -> Result<Vec<SpotifyUrl>, SpotifyError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SpotifyError::io(path, e))?;
    let urls = parse_url_list(&text)?;
    if urls.is_empty() {
        return Err(SpotifyError::EmptyUrlList {
            path: PathBuf::from(path),
        });
    }
    Ok(urls)
}

/// Runs [`fetch`] for each URL in order, pausing `bulk_wait_secs` between
/// URLs.
///
/// A failed URL is recorded and the batch moves on to the next one.
#[instrument(skip_all, fields(urls = urls.len(), target = %target.display()))]
pub async fn fetch_batch<W: Write + Send>(
    zotify: &Zotify,
    urls: &[SpotifyUrl],
    library_dir: &Path,
    target: &Path,
    options: &FetchOptions,
    mut out: W,
) -> BatchFetchReport {
    let mut report = BatchFetchReport::default();
    let total = urls.len();

    for (i, url) in urls.iter().enumerate() {
        if i > 0 && options.bulk_wait_secs > 0 {
            info!(secs = options.bulk_wait_secs, "waiting before next URL");
            tokio::time::sleep(Duration::from_secs(options.bulk_wait_secs)).await;
        }

        let _ = writeln!(out, "\n[{}/{total}] {} ({})", i + 1, url, url.kind());
        let result = fetch(zotify, url, library_dir, target, options, &mut out).await;
        if let Err(e) = &result {
            warn!(url = %url, error = %e, "batch item failed");
        }
        report.results.push((url.clone(), result));
    }

    info!(failed = report.failed(), total, "batch finished");
    report
}
