//! Error types for the Spotify wrapper.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching Spotify content through `zotify`.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// The URL is not a Spotify track, album or playlist URL.
    #[error(
        "invalid Spotify URL: {url} (expected https://open.spotify.com/(track|album|playlist)/ID)"
    )]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// `zotify` could not be started (usually not installed).
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// `zotify` exited with a failure status.
    #[error("zotify exited with {}", exit_description(.code))]
    ZotifyFailed {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },

    /// The zotify library directory does not exist after the download.
    #[error("zotify library not found at {dir}")]
    LibraryMissing {
        /// The expected library directory.
        dir: PathBuf,
    },

    /// The download finished without producing any new audio file.
    #[error("no new audio files found in {dir}")]
    NoNewFiles {
        /// The library directory that was scanned.
        dir: PathBuf,
    },

    /// A URL list file contained no URLs.
    #[error("no Spotify URLs in {path}")]
    EmptyUrlList {
        /// The URL list file.
        path: PathBuf,
    },

    /// File system error.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SpotifyError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a spawn error.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[allow(clippy::ref_option)]
fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}
