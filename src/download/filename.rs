//! Filename derivation, sanitization, and path resolution for downloads.
//!
//! Destination names are deterministic so re-runs land on the same path and
//! the skip-if-present check works.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use url::Url;

/// Extension every downloaded file is given when the URL lacks it.
const AUDIO_EXTENSION: &str = ".mp3";

/// Name used when the URL has no usable final path segment.
const FALLBACK_FILENAME: &str = "download.mp3";

/// Derives the destination filename for a download.
///
/// An explicit name wins (sanitized). Otherwise the URL's final path segment
/// is percent-decoded and sanitized, and `.mp3` is appended when missing.
#[must_use]
pub(crate) fn destination_filename(explicit: Option<&str>, url: &Url) -> String {
    if let Some(name) = explicit.map(sanitize_filename).filter(|n| !n.trim_matches('_').is_empty())
    {
        return name;
    }

    let Some(last) = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
    else {
        return FALLBACK_FILENAME.to_string();
    };

    let decoded = urlencoding::decode(last).unwrap_or_else(|e| {
        debug!(segment = %last, error = %e, "URL decoding failed, using raw segment");
        last.into()
    });

    let mut name = sanitize_filename(&decoded);
    if !name.to_ascii_lowercase().ends_with(AUDIO_EXTENSION) {
        name.push_str(AUDIO_EXTENSION);
    }
    name
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

/// Resolves a path in `dir` that does not exist yet.
///
/// Example with `suffix_start = 1`: `file.mp3`, then `file_1.mp3`, `file_2.mp3`, ...
pub(crate) fn resolve_unique_path(dir: &Path, filename: &str, suffix_start: usize) -> PathBuf {
    let base_path = dir.join(filename);
    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    };

    let mut suffix = suffix_start;
    loop {
        let candidate = dir.join(format!("{stem}_{suffix}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
