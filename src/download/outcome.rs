//! Per-URL outcomes and batch aggregation.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Terminal result of the attempt sequence for one URL.
///
/// Exactly one outcome is produced per input URL. `path` is set on success
/// (including skips), `error` on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOutcome {
    /// The URL as it was requested.
    pub url: String,
    /// Whether the file is present on disk afterwards.
    pub success: bool,
    /// Destination path of the file.
    pub path: Option<PathBuf>,
    /// Human-readable error of the last failed attempt.
    pub error: Option<String>,
    /// Number of HTTP attempts made (0 for skips and setup failures).
    pub attempts: u32,
    /// The file already existed and was left untouched.
    pub skipped: bool,
}

impl DownloadOutcome {
    pub(crate) fn downloaded(url: &str, path: &Path, attempts: u32) -> Self {
        Self {
            url: url.to_string(),
            success: true,
            path: Some(path.to_path_buf()),
            error: None,
            attempts,
            skipped: false,
        }
    }

    pub(crate) fn skipped(url: &str, path: &Path) -> Self {
        Self {
            url: url.to_string(),
            success: true,
            path: Some(path.to_path_buf()),
            error: None,
            attempts: 0,
            skipped: true,
        }
    }

    pub(crate) fn failed(url: &str, error: impl ToString, attempts: u32) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            path: None,
            error: Some(error.to_string()),
            attempts,
            skipped: false,
        }
    }

    /// Whether more than one attempt was needed.
    #[must_use]
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }
}

/// Ordered outcomes of a batch, one per input URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Outcomes in input order.
    pub outcomes: Vec<DownloadOutcome>,
}

impl BatchReport {
    /// Number of URLs whose file is present afterwards (downloads and skips).
    #[must_use]
    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Number of URLs that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    /// Number of URLs that needed at least one retry.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.outcomes.iter().filter(|o| o.was_retried()).count()
    }

    /// Number of URLs skipped because the file already existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped).count()
    }

    /// Total number of outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
