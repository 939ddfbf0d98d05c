//! OGG to MP3 conversion and flattening copies.
//!
//! Conversion shells out to `ffmpeg` once per file through the
//! [`Transcoder`] trait; a failure on one file never stops a batch.
//!
//! # Example
//!
//! ```no_run
//! use cratedigger::convert::{FfmpegTranscoder, convert_all};
//! use indicatif::ProgressBar;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let report = convert_all(
//!     Path::new("./music"),
//!     &FfmpegTranscoder::new(),
//!     false,
//!     &ProgressBar::hidden(),
//! )
//! .await?;
//! println!("converted {} of {}", report.converted, report.total);
//! # Ok(())
//! # }
//! ```

mod batch;
mod copy;
mod error;
mod transcoder;

pub use batch::{
    ConversionReport, ConversionStatus, MIN_OUTPUT_BYTES, conversion_bar, convert_all, convert_file,
    find_unconverted,
};
pub use copy::copy_audio_files;
pub use error::ConvertError;
pub use transcoder::{DEFAULT_QUALITY, FfmpegTranscoder, Transcoder};
