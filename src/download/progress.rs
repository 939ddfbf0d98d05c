//! Progress reporting for streamed downloads.
//!
//! The client reports bytes as chunks hit the disk; the sink decides how to
//! render them. [`BarProgress`] draws an `indicatif` bar, [`NoProgress`]
//! discards everything.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives incremental progress for one download attempt.
pub trait DownloadProgress: Send + Sync {
    /// A response arrived; `total` is the content length when the server sent one.
    fn start(&self, url: &str, total: Option<u64>);

    /// `bytes` more bytes were written to disk.
    fn advance(&self, bytes: u64);

    /// The attempt ended (successfully or not).
    fn finish(&self);
}

/// Progress sink that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {
    fn start(&self, _url: &str, _total: Option<u64>) {}
    fn advance(&self, _bytes: u64) {}
    fn finish(&self) {}
}

/// Terminal progress bar, reset at the start of every attempt.
#[derive(Debug, Clone)]
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// Creates a bar drawn to stderr.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        Self { bar }
    }

    /// Creates a bar that never draws (quiet mode, tests).
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Current byte position, mostly for tests.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadProgress for BarProgress {
    fn start(&self, _url: &str, total: Option<u64>) {
        self.bar.reset();
        if let Some(total) = total {
            self.bar.set_length(total);
            self.bar.set_style(
                ProgressStyle::with_template(
                    "Progress: {percent:>3}% ({bytes}/{total_bytes}) {wide_bar} {bytes_per_sec}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
        } else {
            self.bar.set_style(
                ProgressStyle::with_template("{spinner} {bytes} received ({bytes_per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
        }
    }

    fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_tracks_position_and_resets() {
        let progress = BarProgress::hidden();
        progress.start("https://example.com/a.mp3", Some(10));
        progress.advance(4);
        progress.advance(6);
        assert_eq!(progress.position(), 10);
        progress.finish();

        progress.start("https://example.com/a.mp3", None);
        assert_eq!(progress.position(), 0, "new attempt starts from zero");
    }

    #[test]
    fn test_no_progress_is_inert() {
        let progress = NoProgress;
        progress.start("u", Some(1));
        progress.advance(1);
        progress.finish();
    }
}
