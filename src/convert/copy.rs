//! Flattening copies of audio files into one directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::error::ConvertError;
use crate::download::filename::resolve_unique_path;

/// Copies every file with `extension` under `source` into `target`.
///
/// Subdirectories are flattened. A name that already exists in `target`
/// gets a `_1`, `_2`, ... suffix. Files already inside `target` are not
/// copied again when `target` lies within `source`. A file that fails to
/// copy is logged and skipped.
///
/// `extension` is matched case-insensitively, with or without the leading
/// dot. Returns the number of files copied.
///
/// # Errors
///
/// Returns [`ConvertError::Io`] if `target` cannot be created.
#[instrument(fields(source = %source.display(), target = %target.display()))]
pub fn copy_audio_files(
    source: &Path,
    target: &Path,
    extension: &str,
) -> Result<usize, ConvertError> {
    std::fs::create_dir_all(target).map_err(|e| ConvertError::io(target, e))?;
    let target_canonical = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());

    let wanted = extension.trim_start_matches('.');
    let matching: Vec<PathBuf> = WalkDir::new(source)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
        })
        .filter(|path| !is_within(path, &target_canonical))
        .collect();

    info!(found = matching.len(), extension = %wanted, "copying audio files");

    let mut copied = 0;
    for path in &matching {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "skipping file with non-UTF-8 name");
            continue;
        };

        let dest = resolve_unique_path(target, name, 1);
        match std::fs::copy(path, &dest) {
            Ok(_) => {
                debug!(from = %path.display(), to = %dest.display(), "copied");
                copied += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "copy failed"),
        }
    }

    info!(copied, "copy finished");
    Ok(copied)
}

fn is_within(path: &Path, dir: &Path) -> bool {
    path.parent()
        .and_then(|p| p.canonicalize().ok())
        .is_some_and(|p| p.starts_with(dir))
}
