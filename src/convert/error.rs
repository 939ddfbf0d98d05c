//! Error types for audio conversion.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while converting or copying audio files.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input file is not an OGG file.
    #[error("not an OGG file: {path}")]
    NotOgg {
        /// The rejected input.
        path: PathBuf,
    },

    /// The transcoder binary could not be started (usually not installed).
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The transcoder exited with a failure status.
    #[error("conversion of {path} failed: {stderr}")]
    TranscoderFailed {
        /// The input file.
        path: PathBuf,
        /// What the transcoder printed on stderr.
        stderr: String,
    },

    /// The transcoder reported success but produced no usable file.
    #[error("conversion produced an invalid file: {path} ({size} bytes)")]
    InvalidOutput {
        /// The output file.
        path: PathBuf,
        /// Its size (0 when missing).
        size: u64,
    },

    /// File system error (walk, copy, remove, etc.)
    #[error("IO error at {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    /// Creates a not-OGG error.
    pub fn not_ogg(path: impl Into<PathBuf>) -> Self {
        Self::NotOgg { path: path.into() }
    }

    /// Creates a spawn error.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates a transcoder failure.
    pub fn transcoder_failed(path: impl Into<PathBuf>, stderr: impl Into<String>) -> Self {
        Self::TranscoderFailed {
            path: path.into(),
            stderr: stderr.into(),
        }
    }

    /// Creates an invalid-output error.
    pub fn invalid_output(path: impl Into<PathBuf>, size: u64) -> Self {
        Self::InvalidOutput {
            path: path.into(),
            size,
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
