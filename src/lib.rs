//! cratedigger core library
//!
//! Acquires audio files from two sources, the Wayback Machine (by scraping
//! archived pages for MP3 links) and Spotify (through the external `zotify`
//! downloader), and converts OGG files to MP3 with `ffmpeg`.
//!
//! # Architecture
//!
//! - [`wayback`] - MP3 URL discovery on archived pages and URL rewriting
//! - [`download`] - Sequential, resilient streaming downloads with retry
//! - [`convert`] - OGG to MP3 conversion and flattening copies
//! - [`spotify`] - Spotify URL validation and `zotify` orchestration
//! - [`config`] - Explicit settings merged from CLI, config file and defaults
//! - [`logging`] - Tracing subscriber setup shared by the binaries

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod convert;
pub mod download;
pub mod logging;
pub mod spotify;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;
pub mod wayback;

// Re-export commonly used types
pub use config::{FileConfig, Settings, load_default_file_config};
pub use convert::{
    ConversionReport, ConversionStatus, ConvertError, FfmpegTranscoder, Transcoder,
    convert_all, convert_file, copy_audio_files, find_unconverted,
};
pub use download::{
    BatchOptions, BatchReport, DEFAULT_MAX_RETRIES, DownloadError, DownloadOptions,
    DownloadOutcome, DownloadProgress, Downloader, FailureType, HttpClient, NoProgress,
    RetryDecision, RetryPolicy, classify_error,
};
pub use spotify::{ContentKind, SpotifyError, SpotifyUrl};
pub use wayback::{ArchivePage, DiscoveryError, MediaMarker, SourceKind, discover, find_mp3_urls};
