//! Archive URL parsing and rewriting.
//!
//! An archived page lives at `https://web.archive.org/web/{timestamp}/{original}`.
//! Media referenced from that page has to be rewritten into the same
//! timestamped proxy form, with a marker segment telling the archive how to
//! serve it (`im_` for raw media, `oe_` for original encoding).

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

/// Scheme and host of the Wayback Machine.
pub const ARCHIVE_ROOT: &str = "https://web.archive.org";

/// Timestamp segment, with an optional two-letter marker: `/web/20210101000000im_/`.
#[allow(clippy::expect_used)]
static TIMESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/web/(\d+)(?:[a-z]{2}_)?/").expect("archive timestamp regex is valid") // Static pattern, safe to panic
});

/// Where on the page a candidate URL was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// `src` of a `<source>` nested in `<audio>`.
    AudioSource,
    /// `src` attribute of `<audio>` itself.
    AudioSrc,
    /// `href` of an `<a>` link.
    Anchor,
}

/// Marker segment appended to the archive timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaMarker {
    /// `im_`: serve the capture as raw media.
    Media,
    /// `oe_`: serve the capture in its original encoding.
    OriginalEncoding,
}

impl MediaMarker {
    /// Marker policy per source kind.
    ///
    /// | source | marker |
    /// |--------|--------|
    /// | `<audio><source src>` | `im_` |
    /// | `<audio src>` | `oe_` |
    /// | `<a href>` | `im_` |
    #[must_use]
    pub fn for_source(kind: SourceKind) -> Self {
        match kind {
            SourceKind::AudioSource | SourceKind::Anchor => Self::Media,
            SourceKind::AudioSrc => Self::OriginalEncoding,
        }
    }

    /// The marker as it appears in the URL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Media => "im_",
            Self::OriginalEncoding => "oe_",
        }
    }
}

/// The archived page that candidate URLs are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePage {
    timestamp: Option<String>,
    original: Option<Url>,
}

impl ArchivePage {
    /// Derives timestamp and original page URL from an archived page URL.
    ///
    /// Never fails. Without a timestamp every URL is later returned
    /// unchanged; a warning is logged here, once per page.
    #[must_use]
    pub fn parse(base_url: &str) -> Self {
        let captures = TIMESTAMP_PATTERN.captures(base_url);

        let timestamp = captures
            .as_ref()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let embedded = captures
            .as_ref()
            .and_then(|c| c.get(0))
            .map(|m| &base_url[m.end()..])
            .and_then(parse_embedded_url);

        let original = embedded.or_else(|| Url::parse(base_url).ok());

        if timestamp.is_none() {
            warn!(url = %base_url, "could not extract Wayback Machine timestamp, URLs left unchanged");
        }
        debug!(timestamp = ?timestamp, original = ?original.as_ref().map(Url::as_str), "parsed archive page");

        Self {
            timestamp,
            original,
        }
    }

    /// The capture timestamp (`20210101000000`), if the page URL had one.
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// URL of the page on the original site.
    #[must_use]
    pub fn original_url(&self) -> Option<&Url> {
        self.original.as_ref()
    }

    /// Rewrites `raw` into an archive-addressable URL.
    ///
    /// | input | result |
    /// |-------|--------|
    /// | `http(s)://web.archive.org/web/...` | unchanged |
    /// | `/web/...` | archive root prepended |
    /// | `http(s)://host/...` | `{root}/web/{ts}{marker}/` prepended |
    /// | `//host/...` | as `https://host/...` |
    /// | `/path`, `path` | resolved against the original page, then prefixed |
    ///
    /// Idempotent: normalizing a result again returns it unchanged. Without
    /// a timestamp the input is returned as is.
    #[must_use]
    pub fn normalize(&self, raw: &str, marker: MediaMarker) -> String {
        let raw = raw.trim();
        if raw.is_empty() || is_archive_url(raw) {
            return raw.to_string();
        }

        let Some(timestamp) = self.timestamp.as_deref() else {
            return raw.to_string();
        };

        if raw.starts_with("/web/") {
            return format!("{ARCHIVE_ROOT}{raw}");
        }

        let prefix = format!("{ARCHIVE_ROOT}/web/{timestamp}{}", marker.as_str());

        if let Some(rest) = raw.strip_prefix("//") {
            return format!("{prefix}/https://{rest}");
        }

        if has_http_scheme(raw) {
            return format!("{prefix}/{raw}");
        }

        if let Ok(other) = Url::parse(raw) {
            // mailto:, data:, javascript: and the like are not archive content
            debug!(url = %raw, scheme = other.scheme(), "leaving non-HTTP URL unchanged");
            return raw.to_string();
        }

        match self.original.as_ref().and_then(|base| base.join(raw).ok()) {
            Some(resolved) => format!("{prefix}/{resolved}"),
            None => format!("{prefix}/{}", raw.trim_start_matches('/')),
        }
    }
}

/// Whether `url` already points into the archive's timestamped proxy.
#[must_use]
pub fn is_archive_url(url: &str) -> bool {
    let lower = url.get(..32).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("https://web.archive.org/web/") || lower.starts_with("http://web.archive.org/web/")
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Parses the original URL embedded after the timestamp segment.
///
/// The archive accepts it without a scheme (`/web/2021/site.com/page`).
fn parse_embedded_url(embedded: &str) -> Option<Url> {
    if embedded.is_empty() {
        return None;
    }
    if has_http_scheme(embedded) {
        return Url::parse(embedded).ok();
    }
    Url::parse(&format!("http://{embedded}")).ok()
}
