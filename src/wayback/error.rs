//! Error types for MP3 URL discovery.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors that abort a discovery run.
///
/// Malformed HTML is not an error: it yields a partial or empty result.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The archived page could not be retrieved.
    #[error("failed to fetch archived page {url}: {source}")]
    Fetch {
        /// The page URL.
        url: String,
        /// The underlying HTTP failure.
        #[source]
        source: DownloadError,
    },
}

impl DiscoveryError {
    /// Creates a fetch error.
    pub fn fetch(url: impl Into<String>, source: DownloadError) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }
}
