//! Resilient sequential downloads.
//!
//! This module fetches candidate URLs one at a time into a destination
//! directory with bounded retries and streamed writes.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Skip-if-present pre-check; zero-byte files count as absent
//! - Exponential backoff with jitter between failed attempts
//! - Empty bodies treated as transient failures and cleaned up
//! - Paced batches with exactly one outcome per URL
//! - Configurable timeouts (30s connect, 5min read by default)
//!
//! # Example
//!
//! ```no_run
//! use cratedigger::download::{DownloadOptions, Downloader, HttpClient, RetryPolicy};
//! use std::path::Path;
//!
//! # async fn example() {
//! let downloader = Downloader::new(HttpClient::new(), RetryPolicy::default());
//! let outcome = downloader
//!     .download("https://example.com/track.mp3", Path::new("./downloads"), &DownloadOptions::default())
//!     .await;
//! println!("success: {}", outcome.success);
//! # }
//! ```

mod client;
pub(crate) mod constants;
mod engine;
mod error;
pub(crate) mod filename;
mod outcome;
mod pacing;
mod progress;
mod retry;

pub use client::HttpClient;
pub use engine::{BatchOptions, DownloadOptions, Downloader};
pub use error::DownloadError;
pub use outcome::{BatchReport, DownloadOutcome};
pub use progress::{BarProgress, DownloadProgress, NoProgress};
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};
