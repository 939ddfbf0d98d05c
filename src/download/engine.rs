//! Sequential download engine with retry logic.
//!
//! This module provides the [`Downloader`] which fetches one URL at a time
//! into a destination directory, retrying transient failures with
//! exponential backoff, and turns every URL into exactly one
//! [`DownloadOutcome`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use cratedigger::download::{BatchOptions, Downloader, HttpClient, RetryPolicy};
//!
//! # async fn example() {
//! let downloader = Downloader::new(HttpClient::new(), RetryPolicy::default());
//! let urls = vec!["https://web.archive.org/web/20210101000000im_/https://site.com/a.mp3".to_string()];
//! let report = downloader
//!     .download_all(&urls, Path::new("./downloads"), &BatchOptions::default())
//!     .await;
//! println!("{} successful, {} failed", report.successful(), report.failed());
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::HttpClient;
use super::constants::{DEFAULT_INTER_ITEM_JITTER, DEFAULT_INTER_ITEM_WAIT};
use super::error::DownloadError;
use super::filename::destination_filename;
use super::outcome::{BatchReport, DownloadOutcome};
use super::pacing::Pacer;
use super::progress::{DownloadProgress, NoProgress};
use super::retry::{RetryDecision, RetryPolicy, classify_error};

/// Options for a single download.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Explicit destination filename; derived from the URL when `None`.
    pub filename: Option<String>,
    /// Re-download even if a non-empty file already exists.
    pub force: bool,
}

/// Options for a sequential batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Re-download files that already exist.
    pub force: bool,
    /// Fixed pause between successive URLs.
    pub wait: Duration,
    /// Upper bound of the random jitter added to `wait`.
    pub wait_jitter: Duration,
}

impl BatchOptions {
    /// Sets the pause between items.
    ///
    /// A zero wait also drops the jitter, so `--wait 0` never sleeps.
    #[must_use]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        if wait.is_zero() {
            self.wait_jitter = Duration::ZERO;
        }
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            force: false,
            wait: DEFAULT_INTER_ITEM_WAIT,
            wait_jitter: DEFAULT_INTER_ITEM_JITTER,
        }
    }
}

/// Sequential downloader.
///
/// Holds the pooled HTTP client, the retry policy and the progress sink.
/// One request is in flight at a time.
pub struct Downloader {
    client: HttpClient,
    retry_policy: RetryPolicy,
    progress: Arc<dyn DownloadProgress>,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("client", &self.client)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Creates a downloader that reports no progress.
    #[must_use]
    #[instrument(level = "debug", skip(client, retry_policy), fields(max_attempts = retry_policy.max_attempts()))]
    pub fn new(client: HttpClient, retry_policy: RetryPolicy) -> Self {
        debug!("creating downloader");
        Self {
            client,
            retry_policy,
            progress: Arc::new(NoProgress),
        }
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn DownloadProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Downloads one URL into `dest_dir`.
    ///
    /// The destination directory is created if absent. A non-empty file at
    /// the destination short-circuits to a skipped success without any
    /// network access unless `options.force` is set; a zero-byte file counts
    /// as absent.
    ///
    /// Never fails: setup errors and exhausted retries become a failed
    /// outcome.
    #[instrument(skip(self, options), fields(url = %url, dest = %dest_dir.display()))]
    pub async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        options: &DownloadOptions,
    ) -> DownloadOutcome {
        let Ok(parsed) = Url::parse(url) else {
            warn!("invalid URL");
            return DownloadOutcome::failed(url, DownloadError::invalid_url(url), 0);
        };

        if let Err(e) = tokio::fs::create_dir_all(dest_dir).await {
            let error = DownloadError::io(dest_dir, e);
            warn!(error = %error, "cannot create destination directory");
            return DownloadOutcome::failed(url, error, 0);
        }

        let path = dest_dir.join(destination_filename(options.filename.as_deref(), &parsed));

        if !options.force && is_non_empty_file(&path).await {
            info!(path = %path.display(), "file already exists, skipping");
            return DownloadOutcome::skipped(url, &path);
        }

        match self.download_with_retry(url, &path).await {
            Ok(attempts) => {
                info!(path = %path.display(), attempts, "download completed");
                DownloadOutcome::downloaded(url, &path, attempts)
            }
            Err((e, attempts)) => {
                warn!(error = %e, attempts, "download failed");
                DownloadOutcome::failed(url, e, attempts)
            }
        }
    }

    /// Downloads every URL in order, pausing between items.
    ///
    /// Returns exactly one outcome per input URL, in input order; a failure
    /// never stops the rest of the batch.
    #[instrument(skip(self, urls, options), fields(count = urls.len(), dest = %dest_dir.display()))]
    pub async fn download_all(
        &self,
        urls: &[String],
        dest_dir: &Path,
        options: &BatchOptions,
    ) -> BatchReport {
        info!("starting batch");
        let mut pacer = Pacer::new(options.wait, options.wait_jitter);
        let item_options = DownloadOptions {
            filename: None,
            force: options.force,
        };

        let mut report = BatchReport::default();
        for (index, url) in urls.iter().enumerate() {
            pacer.acquire().await;
            info!(item = index + 1, total = urls.len(), url = %url, "processing");
            report
                .outcomes
                .push(self.download(url, dest_dir, &item_options).await);
        }

        info!(
            successful = report.successful(),
            failed = report.failed(),
            retried = report.retried(),
            "batch finished"
        );
        report
    }

    /// Attempt loop for one URL.
    ///
    /// # Returns
    ///
    /// - `Ok(u32)` - Attempts used on success
    /// - `Err((DownloadError, u32))` - Last error and total attempt count
    async fn download_with_retry(
        &self,
        url: &str,
        path: &Path,
    ) -> Result<u32, (DownloadError, u32)> {
        let policy = &self.retry_policy;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "attempting download");

            match self
                .client
                .download_to_path(url, path, self.progress.as_ref())
                .await
            {
                Ok(bytes) => {
                    debug!(attempt, bytes, "attempt succeeded");
                    return Ok(attempt);
                }
                Err(e) => match policy.should_retry(classify_error(&e), attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        info!(
                            url = %url,
                            attempt = next_attempt,
                            max_attempts = policy.max_attempts(),
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "retrying download"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        debug!(url = %url, %reason, "not retrying download");
                        remove_leftover(path).await;
                        return Err((e, attempt));
                    }
                },
            }
        }
    }
}

async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

/// Removes a stale file left at the destination (a zero-byte placeholder
/// from an earlier run that this run failed to replace).
async fn remove_leftover(path: &Path) {
    if tokio::fs::metadata(path).await.is_ok_and(|m| m.len() == 0) {
        let _ = tokio::fs::remove_file(path).await;
    }
}
