//! Spotify URL validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::error::SpotifyError;

/// `https://open.spotify.com/{kind}/{22-char id}` with an optional query string.
#[allow(clippy::expect_used)]
static SPOTIFY_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://open\.spotify\.com/(track|album|playlist)/([a-zA-Z0-9]{22})(\?.*)?$")
        .expect("Spotify URL regex is valid") // Static pattern, safe to panic
});

/// What a Spotify URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// A single track.
    Track,
    /// An album.
    Album,
    /// A playlist.
    Playlist,
}

impl ContentKind {
    /// Lowercase name as used in the URL path.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Playlist => "playlist",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated Spotify track, album or playlist URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyUrl {
    url: String,
    kind: ContentKind,
    id: String,
}

impl SpotifyUrl {
    /// Validates `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SpotifyError::InvalidUrl`] if `url` is not of the form
    /// `https://open.spotify.com/(track|album|playlist)/<22 alphanumerics>`.
    pub fn parse(url: &str) -> Result<Self, SpotifyError> {
        let captures = SPOTIFY_URL_PATTERN
            .captures(url)
            .ok_or_else(|| SpotifyError::invalid_url(url))?;

        let kind = match &captures[1] {
            "track" => ContentKind::Track,
            "album" => ContentKind::Album,
            _ => ContentKind::Playlist,
        };

        Ok(Self {
            url: url.to_string(),
            kind,
            id: captures[2].to_string(),
        })
    }

    /// The URL as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Track, album or playlist.
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// The 22-character Spotify ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for SpotifyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Parses a URL list with one Spotify URL per line.
///
/// Blank lines and lines starting with `#` are ignored.
///
/// # Errors
///
/// Returns [`SpotifyError::InvalidUrl`] for the first line that is not a
/// valid Spotify URL.
pub fn parse_url_list(text: &str) -> Result<Vec<SpotifyUrl>, SpotifyError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(SpotifyUrl::parse)
        .collect()
}
