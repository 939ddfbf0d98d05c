//! MP3 reference scanning on archived HTML pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

use super::archive::{ArchivePage, MediaMarker, SourceKind};
use super::error::DiscoveryError;
use crate::download::HttpClient;

const AUDIO_EXTENSION: &str = ".mp3";

#[allow(clippy::expect_used)]
static AUDIO_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("audio").expect("audio selector is valid")); // Static pattern, safe to panic

#[allow(clippy::expect_used)]
static SOURCE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("source[src]").expect("source selector is valid")); // Static pattern, safe to panic

#[allow(clippy::expect_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid")); // Static pattern, safe to panic

/// Finds MP3 references in `html` and rewrites them into archive URLs.
///
/// Scans, in document order, `<source src>` inside every `<audio>`, then the
/// `<audio src>` attribute itself, then every `<a href>`. Only references
/// whose path ends in `.mp3` (any case, query and fragment ignored) are kept.
///
/// The result is deduplicated by logical URL, keeping first-seen order. An
/// empty result is valid; malformed HTML yields whatever could be parsed.
#[must_use]
#[instrument(skip(html), fields(html_len = html.len()))]
pub fn discover(html: &str, base_url: &str) -> Vec<String> {
    let page = ArchivePage::parse(base_url);
    let document = Html::parse_document(html);
    let mut found = Discovered::default();

    for audio in document.select(&AUDIO_SELECTOR) {
        for source in audio.select(&SOURCE_SELECTOR) {
            found.offer(&page, attr(source, "src"), SourceKind::AudioSource);
        }
        found.offer(&page, attr(audio, "src"), SourceKind::AudioSrc);
    }

    for anchor in document.select(&ANCHOR_SELECTOR) {
        found.offer(&page, attr(anchor, "href"), SourceKind::Anchor);
    }

    debug!(count = found.urls.len(), "discovery finished");
    found.urls
}

/// Fetches an archived page and discovers the MP3 URLs on it.
///
/// # Errors
///
/// Returns [`DiscoveryError::Fetch`] if the page cannot be retrieved
/// (network failure, timeout, non-2xx status).
#[instrument(skip(client), fields(url = %archive_url))]
pub async fn find_mp3_urls(
    client: &HttpClient,
    archive_url: &str,
) -> Result<Vec<String>, DiscoveryError> {
    let html = client
        .fetch_text(archive_url)
        .await
        .map_err(|e| DiscoveryError::fetch(archive_url, e))?;

    let urls = discover(&html, archive_url);
    info!(count = urls.len(), "found MP3 URLs");
    Ok(urls)
}

fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Whether the path part of `raw` ends in `.mp3`.
fn has_audio_extension(raw: &str) -> bool {
    let path = raw.split(['?', '#']).next().unwrap_or(raw).trim_end();
    path.to_ascii_lowercase().ends_with(AUDIO_EXTENSION)
}

/// Insertion-ordered set of discovered URLs.
#[derive(Debug, Default)]
struct Discovered {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl Discovered {
    fn offer(&mut self, page: &ArchivePage, raw: Option<&str>, kind: SourceKind) {
        let Some(raw) = raw.map(str::trim).filter(|r| has_audio_extension(r)) else {
            return;
        };

        // The same file referenced from an <audio> tag and a link differs
        // only in its marker; key on one marker so it is reported once.
        let key = page.normalize(raw, MediaMarker::Media);
        if !self.seen.insert(key) {
            return;
        }

        let url = page.normalize(raw, MediaMarker::for_source(kind));
        debug!(url = %url, ?kind, "discovered");
        self.urls.push(url);
    }
}
