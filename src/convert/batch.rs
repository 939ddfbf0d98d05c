//! OGG to MP3 conversion of single files and whole directory trees.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::error::ConvertError;
use super::transcoder::Transcoder;

/// Outputs smaller than this are treated as failed conversions.
pub const MIN_OUTPUT_BYTES: u64 = 1024;

/// Result of a successful [`convert_file`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionStatus {
    /// A new MP3 was written.
    Converted {
        /// The MP3 path.
        output: PathBuf,
    },
    /// The MP3 sibling already existed; nothing was done.
    AlreadyConverted {
        /// The MP3 path.
        output: PathBuf,
    },
}

/// Summary of a [`convert_all`] run.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Files that needed conversion.
    pub total: usize,
    /// Files converted successfully.
    pub converted: usize,
    /// Files that failed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl ConversionReport {
    /// Whether every file was converted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.converted == self.total
    }
}

/// Per-file bar for [`convert_all`], drawn to stderr unless `hidden`.
#[must_use]
pub fn conversion_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    bar.set_style(
        ProgressStyle::with_template("[{pos}/{len}] {wide_bar} Converting: {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Lists every `.ogg` file under `dir` that has no `.mp3` sibling.
///
/// The walk is recursive; entries that cannot be read are skipped with a
/// warning. The result is sorted.
///
/// # Errors
///
/// Returns [`ConvertError::Io`] if `dir` is not a readable directory.
#[instrument(fields(dir = %dir.display()))]
pub fn find_unconverted(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    if let Err(e) = std::fs::read_dir(dir) {
        return Err(ConvertError::io(dir, e));
    }

    let mut unconverted: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_ogg(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .filter(|path| !mp3_sibling(path).exists())
        .collect();

    unconverted.sort();
    debug!(count = unconverted.len(), "found unconverted files");
    Ok(unconverted)
}

/// Converts one OGG file to an MP3 next to it.
///
/// The output must exist and be at least [`MIN_OUTPUT_BYTES`] long; a
/// smaller file is removed and reported as [`ConvertError::InvalidOutput`].
/// The original is removed only after a verified conversion.
///
/// # Errors
///
/// Returns [`ConvertError`] if the input is not OGG, the transcoder fails,
/// the output is invalid, or removing the original fails.
#[instrument(skip(transcoder), fields(path = %path.display()))]
pub async fn convert_file(
    transcoder: &dyn Transcoder,
    path: &Path,
    remove_original: bool,
) -> Result<ConversionStatus, ConvertError> {
    if !is_ogg(path) {
        return Err(ConvertError::not_ogg(path));
    }

    let output = mp3_sibling(path);
    if output.exists() {
        debug!(output = %output.display(), "MP3 already exists");
        return Ok(ConversionStatus::AlreadyConverted { output });
    }

    if let Err(e) = transcoder.transcode(path, &output).await {
        // A transcoder that died mid-write leaves a sibling that would
        // mark the file as converted
        let _ = tokio::fs::remove_file(&output).await;
        return Err(e);
    }

    let size = tokio::fs::metadata(&output)
        .await
        .map(|meta| meta.len())
        .unwrap_or(0);
    if size < MIN_OUTPUT_BYTES {
        let _ = tokio::fs::remove_file(&output).await;
        return Err(ConvertError::invalid_output(output, size));
    }

    if remove_original {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| ConvertError::io(path, e))?;
        debug!("removed original");
    }

    Ok(ConversionStatus::Converted { output })
}

/// Converts every unconverted OGG file under `dir`.
///
/// One failure never stops the rest. `progress` is advanced once per file
/// and shows the current file name.
///
/// # Errors
///
/// Returns [`ConvertError::Io`] only if `dir` cannot be scanned.
#[instrument(skip(transcoder, progress), fields(dir = %dir.display()))]
pub async fn convert_all(
    dir: &Path,
    transcoder: &dyn Transcoder,
    remove_originals: bool,
    progress: &ProgressBar,
) -> Result<ConversionReport, ConvertError> {
    let files = find_unconverted(dir)?;
    let mut report = ConversionReport {
        total: files.len(),
        ..ConversionReport::default()
    };

    if files.is_empty() {
        info!("no unconverted OGG files found");
        return Ok(report);
    }

    info!(count = files.len(), "converting OGG files");
    progress.set_length(files.len() as u64);

    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.set_message(name);

        match convert_file(transcoder, &file, remove_originals).await {
            Ok(_) => report.converted += 1,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "conversion failed");
                report.failed.push((file, e.to_string()));
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    info!(
        converted = report.converted,
        total = report.total,
        "conversion finished"
    );
    Ok(report)
}

fn is_ogg(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ogg"))
}

fn mp3_sibling(path: &Path) -> PathBuf {
    path.with_extension("mp3")
}
