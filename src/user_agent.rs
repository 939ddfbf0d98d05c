//! Shared User-Agent string for page and file requests.
//!
//! The Wayback Machine throttles or rejects unknown agents on media
//! endpoints, so both page fetches and downloads present a desktop browser.

/// Browser User-Agent used for archive page fetches and MP3 downloads.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
