//! Driving the external `zotify` downloader.
//!
//! `zotify` prints a mix of status lines, progress bars, spinners and noisy
//! lyrics errors on both stdout and stderr. Lines are classified with
//! [`classify_line`] and rendered by [`OutputRenderer`], which redraws
//! progress in place and prints everything else on its own line.

use std::io::Write;
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::error::SpotifyError;
use super::url::{ContentKind, SpotifyUrl};

/// Default `zotify` executable name, resolved through `PATH`.
pub const DEFAULT_PROGRAM: &str = "zotify";

/// Default pause zotify takes between tracks of a bulk download.
pub const DEFAULT_BULK_WAIT_SECS: u64 = 30;

/// Patterns tried, in order, on `zotify --info` output for album and
/// playlist track counts.
#[allow(clippy::expect_used)]
static TRACK_COUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Tracks: (\d+)",
        r"(?i)(\d+) tracks",
        r"(?i)(\d+) songs",
        r"(?i)Downloading (\d+) songs",
        r"(?i)Downloading (\d+) tracks",
        r"(?i)Found (\d+) items",
        r"(?i)(\d+) track",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("track count regex is valid")) // Static pattern, safe to panic
    .collect()
});

/// Lyrics lookups fail for most tracks; these lines are hidden by default.
const LYRICS_NOISE: [&str; 3] = ["Spotify API Error", "lyrics not available", "Skipping lyrics"];

/// Status bullets zotify prints for preparation and conversion steps.
const STATUS_MARKERS: [char; 2] = ['●', '∙'];

/// Spinner frames zotify animates while waiting.
const SPINNER_FRAMES: [char; 9] = ['⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Audio container zotify should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadFormat {
    /// Let zotify convert to MP3 itself.
    Mp3,
    /// Keep Spotify's OGG Vorbis stream.
    Ogg,
}

impl DownloadFormat {
    /// Value of zotify's `--download-format` flag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
        }
    }
}

/// Requested Spotify stream bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioQuality {
    /// 320 kbps, premium accounts only.
    Kbps320,
    /// 160 kbps.
    Kbps160,
    /// 96 kbps.
    Kbps96,
}

impl AudioQuality {
    /// Parses a bitrate given as `320`, `160` or `96`.
    #[must_use]
    pub fn from_kbps(kbps: &str) -> Option<Self> {
        match kbps {
            "320" => Some(Self::Kbps320),
            "160" => Some(Self::Kbps160),
            "96" => Some(Self::Kbps96),
            _ => None,
        }
    }

    /// Value of zotify's `--download-quality` flag.
    #[must_use]
    pub fn as_zotify_str(self) -> &'static str {
        match self {
            Self::Kbps320 => "very_high",
            Self::Kbps160 => "high",
            Self::Kbps96 => "normal",
        }
    }
}

/// How a line of zotify output should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Not shown (blank, or suppressed lyrics noise).
    Skip,
    /// The inter-track "Waiting N seconds" notice.
    Waiting,
    /// A `[●] ...` step line, always on its own line.
    Status,
    /// A progress bar or spinner frame, redrawn in place.
    Progress,
    /// Anything else.
    Message,
}

/// Classifies one line of zotify output.
#[must_use]
pub fn classify_line(line: &str, suppress_lyrics_errors: bool) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Skip;
    }
    if suppress_lyrics_errors && LYRICS_NOISE.iter().any(|noise| line.contains(noise)) {
        return LineKind::Skip;
    }
    if line.contains("Waiting") && line.contains("seconds") {
        return LineKind::Waiting;
    }
    if line.starts_with('[') && line.contains(STATUS_MARKERS) {
        return LineKind::Status;
    }
    if line.contains('%') && (line.contains('|') || line.contains("B/s")) {
        return LineKind::Progress;
    }
    if line.contains(SPINNER_FRAMES) {
        return LineKind::Progress;
    }
    LineKind::Message
}

/// Extracts the number of tracks from `zotify --info` output.
///
/// A track URL is always one track. Returns `None` when no pattern matches.
#[must_use]
pub fn track_count(kind: ContentKind, info_output: &str) -> Option<u32> {
    if kind == ContentKind::Track {
        return Some(1);
    }
    TRACK_COUNT_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(info_output))
        .and_then(|captures| captures[1].parse().ok())
}

/// Arguments for a zotify download.
///
/// Without a `quality`, zotify's own configured quality applies.
#[must_use]
pub fn download_args(
    url: &SpotifyUrl,
    bulk_wait_secs: u64,
    format: DownloadFormat,
    quality: Option<AudioQuality>,
) -> Vec<String> {
    let mut args = vec![
        url.as_str().to_string(),
        "--bulk-wait-time".to_string(),
        bulk_wait_secs.to_string(),
        "--download-format".to_string(),
        format.as_str().to_string(),
    ];
    if let Some(quality) = quality {
        args.push("--download-quality".to_string());
        args.push(quality.as_zotify_str().to_string());
    }
    args
}

/// Renders classified zotify output to a terminal-like writer.
#[derive(Debug)]
pub struct OutputRenderer<W: Write> {
    out: W,
    suppress_lyrics_errors: bool,
    /// The cursor sits on a line that will be redrawn.
    in_place: bool,
}

impl<W: Write> OutputRenderer<W> {
    /// Creates a renderer writing to `out`.
    pub fn new(out: W, suppress_lyrics_errors: bool) -> Self {
        Self {
            out,
            suppress_lyrics_errors,
            in_place: false,
        }
    }

    /// Renders one line.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn line(&mut self, line: &str) -> std::io::Result<()> {
        let clean = line.trim();
        match classify_line(clean, self.suppress_lyrics_errors) {
            LineKind::Skip => {}
            LineKind::Waiting => {
                write!(self.out, "\rDownload successful. Processing...")?;
                self.in_place = true;
            }
            LineKind::Progress => {
                write!(self.out, "\r{clean}")?;
                self.in_place = true;
            }
            LineKind::Status | LineKind::Message => {
                self.end_in_place()?;
                writeln!(self.out, "{clean}")?;
            }
        }
        self.out.flush()
    }

    /// Terminates a pending in-place line.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn finish(&mut self) -> std::io::Result<()> {
        self.end_in_place()?;
        self.out.flush()
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn end_in_place(&mut self) -> std::io::Result<()> {
        if self.in_place {
            writeln!(self.out)?;
            self.in_place = false;
        }
        Ok(())
    }
}

/// Handle on the `zotify` executable.
#[derive(Debug, Clone)]
pub struct Zotify {
    program: String,
}

impl Default for Zotify {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Zotify {
    /// Uses `program` as the zotify executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable that will be run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Runs `zotify --info URL` and estimates the track count.
    ///
    /// Failures are logged and yield `None`: the count is informational.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn track_count(&self, url: &SpotifyUrl) -> Option<u32> {
        if url.kind() == ContentKind::Track {
            return Some(1);
        }

        let output = match Command::new(&self.program)
            .arg("--info")
            .arg(url.as_str())
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "could not query track count");
                return None;
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let count = track_count(url.kind(), &text);
        if count.is_none() {
            let preview: String = text.chars().take(200).collect();
            debug!(output = %preview, "no track count in zotify info output");
        }
        count
    }

    /// Runs a zotify download, streaming its output through `renderer`.
    ///
    /// stdout and stderr are read concurrently, line by line.
    ///
    /// # Errors
    ///
    /// Returns [`SpotifyError::Spawn`] if zotify cannot be started,
    /// [`SpotifyError::ZotifyFailed`] on a non-zero exit, and
    /// [`SpotifyError::Io`] if its output cannot be read or rendered.
    #[instrument(skip(self, renderer), fields(url = %url))]
    pub async fn download<W: Write + Send>(
        &self,
        url: &SpotifyUrl,
        bulk_wait_secs: u64,
        format: DownloadFormat,
        quality: Option<AudioQuality>,
        renderer: &mut OutputRenderer<W>,
    ) -> Result<(), SpotifyError> {
        let args = download_args(url, bulk_wait_secs, format, quality);
        debug!(program = %self.program, ?args, "starting zotify");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SpotifyError::spawn(&self.program, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SpotifyError::io(&self.program, missing_pipe("stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SpotifyError::io(&self.program, missing_pipe("stderr")))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let (mut out_open, mut err_open) = (true, true);

        while out_open || err_open {
            let next = tokio::select! {
                line = out_lines.next_line(), if out_open => (line, true),
                line = err_lines.next_line(), if err_open => (line, false),
            };
            match next {
                (Ok(Some(line)), _) => renderer
                    .line(&line)
                    .map_err(|e| SpotifyError::io(&self.program, e))?,
                (Ok(None), true) => out_open = false,
                (Ok(None), false) => err_open = false,
                (Err(e), _) => return Err(SpotifyError::io(&self.program, e)),
            }
        }
        renderer
            .finish()
            .map_err(|e| SpotifyError::io(&self.program, e))?;

        let status = child
            .wait()
            .await
            .map_err(|e| SpotifyError::io(&self.program, e))?;
        if !status.success() {
            return Err(SpotifyError::ZotifyFailed {
                code: status.code(),
            });
        }
        Ok(())
    }
}

fn missing_pipe(name: &str) -> std::io::Error {
    std::io::Error::other(format!("zotify {name} was not captured"))
}
