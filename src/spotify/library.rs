//! Zotify library bookkeeping.
//!
//! zotify always writes into its own library directory. To find what a run
//! produced, the library is snapshotted before the download and compared
//! afterwards; the new files (plus their cover art) are then placed into the
//! user's target directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Audio files zotify produces.
pub const AUDIO_EXTENSIONS: [&str; 2] = ["ogg", "mp3"];

/// Cover art zotify stores next to the audio.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Default zotify library: `$HOME/Music/Zotify Music`.
#[must_use]
pub fn default_library_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join("Music").join("Zotify Music"))
}

/// Directory layout in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Every file directly in the target.
    Flat,
    /// Artist/album folders as zotify created them.
    Nested,
}

/// Whether the library keeps its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Copy, leaving the library intact.
    Copy,
    /// Move out of the library.
    Move,
}

/// Files that appeared in the library during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFiles {
    /// New audio files, sorted.
    pub audio: Vec<PathBuf>,
    /// Cover images related to the new audio, sorted.
    pub images: Vec<PathBuf>,
}

/// Summary of a [`place`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementReport {
    /// Audio files copied or moved.
    pub audio: usize,
    /// Cover images copied or moved.
    pub images: usize,
    /// Files left alone because the destination already existed.
    pub skipped: usize,
    /// Files that could not be placed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl PlacementReport {
    /// Something was placed, or everything was already there.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.audio + self.images > 0 || self.skipped > 0
    }
}

/// Lists every file under `dir` whose extension is in `extensions`.
///
/// Matching is case-insensitive. A missing directory yields an empty set.
#[must_use]
pub fn snapshot(dir: &Path, extensions: &[&str]) -> BTreeSet<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| has_extension(path, extensions))
        .collect()
}

/// Finds the audio files added to `library` since `before`, plus cover art.
///
/// An image is related when it sits in the same directory as a new audio
/// file or is named `cover.*`.
#[must_use]
#[instrument(skip(before), fields(library = %library.display(), before = before.len()))]
pub fn collect_new(library: &Path, before: &BTreeSet<PathBuf>) -> NewFiles {
    let audio: Vec<PathBuf> = snapshot(library, &AUDIO_EXTENSIONS)
        .into_iter()
        .filter(|path| !before.contains(path))
        .collect();

    let audio_dirs: BTreeSet<&Path> = audio.iter().filter_map(|p| p.parent()).collect();

    let images: Vec<PathBuf> = snapshot(library, &IMAGE_EXTENSIONS)
        .into_iter()
        .filter(|image| {
            image.parent().is_some_and(|dir| audio_dirs.contains(dir)) || is_cover(image)
        })
        .collect();

    debug!(audio = audio.len(), images = images.len(), "collected new files");
    NewFiles { audio, images }
}

/// Places new files into `target`.
///
/// Flat layout uses bare file names; cover images are prefixed with their
/// folder name (`Album-cover.jpg`) so albums do not collide. Nested layout
/// keeps the path relative to `library`. Existing destinations are skipped.
/// A file that fails is recorded and the rest continue.
#[instrument(skip(files), fields(target = %target.display(), ?layout, ?mode))]
pub fn place(
    files: &NewFiles,
    library: &Path,
    target: &Path,
    layout: Layout,
    mode: TransferMode,
) -> PlacementReport {
    let mut report = PlacementReport::default();

    for (source, is_image) in files
        .audio
        .iter()
        .map(|p| (p, false))
        .chain(files.images.iter().map(|p| (p, true)))
    {
        let Some(dest) = destination(source, library, target, layout, is_image) else {
            warn!(path = %source.display(), "cannot derive destination, skipping");
            report
                .failed
                .push((source.clone(), "no file name".to_string()));
            continue;
        };

        if dest.exists() {
            debug!(dest = %dest.display(), "already exists in target, skipping");
            report.skipped += 1;
            continue;
        }

        match transfer(source, &dest, mode) {
            Ok(()) => {
                debug!(from = %source.display(), to = %dest.display(), "placed");
                if is_image {
                    report.images += 1;
                } else {
                    report.audio += 1;
                }
            }
            Err(e) => {
                warn!(path = %source.display(), error = %e, "failed to place file");
                report.failed.push((source.clone(), e.to_string()));
            }
        }
    }

    info!(
        audio = report.audio,
        images = report.images,
        skipped = report.skipped,
        failed = report.failed.len(),
        "placement finished"
    );
    report
}

fn destination(
    source: &Path,
    library: &Path,
    target: &Path,
    layout: Layout,
    is_image: bool,
) -> Option<PathBuf> {
    match layout {
        Layout::Nested => match source.strip_prefix(library) {
            Ok(relative) => Some(target.join(relative)),
            Err(_) => source.file_name().map(|name| target.join(name)),
        },
        Layout::Flat => {
            let name = source.file_name()?.to_string_lossy();
            if !is_image {
                return Some(target.join(&*name));
            }
            let folder = source
                .parent()
                .and_then(Path::file_name)
                .map(|f| f.to_string_lossy());
            Some(match folder {
                Some(folder) => target.join(format!("{folder}-{name}")),
                None => target.join(&*name),
            })
        }
    }
}

fn transfer(source: &Path, dest: &Path, mode: TransferMode) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match mode {
        TransferMode::Copy => std::fs::copy(source, dest).map(|_| ()),
        TransferMode::Move => {
            if std::fs::rename(source, dest).is_ok() {
                return Ok(());
            }
            // Cross-device moves cannot rename
            std::fs::copy(source, dest)?;
            std::fs::remove_file(source)
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn is_cover(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with("cover."))
}
