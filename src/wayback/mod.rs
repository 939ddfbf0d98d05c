//! MP3 URL discovery on Wayback Machine pages.
//!
//! Given an archived page, finds audio references in `<audio>` elements and
//! links, and rewrites each into an archive-addressable URL that can be
//! handed to the [`Downloader`](crate::download::Downloader).
//!
//! # Example
//!
//! ```
//! use cratedigger::wayback::discover;
//!
//! let urls = discover(
//!     r#"<a href="/x/track.mp3">Track</a>"#,
//!     "https://web.archive.org/web/20210101000000/https://site.com/page.html",
//! );
//! assert_eq!(
//!     urls,
//!     vec!["https://web.archive.org/web/20210101000000im_/https://site.com/x/track.mp3"]
//! );
//! ```

mod archive;
mod discover;
mod error;

pub use archive::{ARCHIVE_ROOT, ArchivePage, MediaMarker, SourceKind, is_archive_url};
pub use discover::{discover, find_mp3_urls};
pub use error::DiscoveryError;
