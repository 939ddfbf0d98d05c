//! Transcoder seam and the `ffmpeg` implementation.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::error::ConvertError;

/// Default `ffmpeg` executable name, resolved through `PATH`.
const DEFAULT_PROGRAM: &str = "ffmpeg";

/// Default LAME VBR quality (`-q:a 2`, roughly 190 kbps).
pub const DEFAULT_QUALITY: u8 = 2;

/// Converts one audio file into another.
///
/// This trait uses `async_trait` so conversion batches can take a
/// `&dyn Transcoder`, which lets tests swap in a fake.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Writes `output` from `input`, overwriting any existing file.
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;
}

/// Runs `ffmpeg` with the LAME MP3 encoder.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    quality: u8,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            quality: DEFAULT_QUALITY,
        }
    }
}

impl FfmpegTranscoder {
    /// Creates a transcoder using `ffmpeg` from `PATH` and quality 2.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the VBR quality (0 best, 9 smallest).
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(9);
        self
    }

    /// Uses a different executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-i".into(),
            input.as_os_str().to_os_string(),
            "-codec:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            self.quality.to_string().into(),
            output.as_os_str().to_os_string(),
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[instrument(skip(self), fields(input = %input.display(), output = %output.display()))]
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        debug!(program = %self.program, quality = self.quality, "running transcoder");

        let result = Command::new(&self.program)
            .args(self.args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ConvertError::spawn(&self.program, e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ConvertError::transcoder_failed(input, stderr.trim()));
        }

        Ok(())
    }
}
