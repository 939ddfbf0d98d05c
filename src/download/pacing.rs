//! Inter-item pacing for sequential batches.
//!
//! The archive throttles clients that fetch captures back to back. A
//! [`Pacer`] sleeps a fixed wait plus random jitter before every item except
//! the first. This is not retry backoff: it applies between distinct URLs.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

/// Enforces a pause between successive items of a batch.
#[derive(Debug)]
pub(crate) struct Pacer {
    wait: Duration,
    jitter: Duration,
    /// `false` until the first item has been admitted (first item is immediate).
    started: bool,
}

impl Pacer {
    pub(crate) fn new(wait: Duration, jitter: Duration) -> Self {
        Self {
            wait,
            jitter,
            started: false,
        }
    }

    /// Waits, if needed, before the next item.
    ///
    /// Returns the delay that was applied.
    #[instrument(skip(self))]
    pub(crate) async fn acquire(&mut self) -> Duration {
        if !self.started {
            self.started = true;
            return Duration::ZERO;
        }

        let delay = self.next_delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis(), "pausing before next item");
            tokio::time::sleep(delay).await;
        }
        delay
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_delay(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return self.wait;
        }
        self.wait + Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}
