//! Constants for the download module (timeouts, chunking, pacing).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for long recordings).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default wait between successive downloads in a batch.
pub const DEFAULT_INTER_ITEM_WAIT: Duration = Duration::from_secs(2);

/// Upper bound of the random jitter added to the inter-item wait.
pub const DEFAULT_INTER_ITEM_JITTER: Duration = Duration::from_secs(1);
