//! Run settings and the optional config file.
//!
//! Every value a tool needs is resolved once into a [`Settings`] value and
//! passed down explicitly. Precedence: command-line flag, then config file,
//! then built-in default. The binaries apply the first layer; this module
//! provides the other two.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_INTER_ITEM_WAIT, READ_TIMEOUT_SECS,
};
use crate::download::{DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};
use crate::spotify::zotify::DEFAULT_BULK_WAIT_SECS;

/// Default directory for Wayback downloads.
pub const DEFAULT_OUTPUT_DIR: &str = "mp3_downloads";

/// Default directory Spotify downloads are placed in.
pub const DEFAULT_SPOTIFY_TARGET_DIR: &str = "spotify_downloads";

/// Directory name under the config home.
const APP_DIR: &str = "cratedigger";

/// Upper bound for attempts per URL.
pub const MAX_RETRIES_LIMIT: u32 = 20;

/// Upper bound for the inter-item wait, in seconds.
pub const MAX_WAIT_SECS: f64 = 600.0;

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    /// `info` level.
    Default,
    /// `debug` level.
    Verbose,
    /// Errors only.
    Quiet,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
        }
    }
}

/// Values read from the config file. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Default directory for Wayback downloads.
    pub output_dir: Option<PathBuf>,
    /// Attempts per URL.
    pub max_retries: Option<u32>,
    /// Pause between downloads, in seconds (fractional).
    pub wait_secs: Option<f64>,
    /// Base delay of the retry backoff, in seconds (fractional).
    pub retry_base_delay_secs: Option<f64>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Default target directory for Spotify downloads.
    pub spotify_target_dir: Option<PathBuf>,
    /// zotify's pause between tracks, in seconds.
    pub bulk_wait_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range key.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_retries) = self.max_retries
            && !(1..=MAX_RETRIES_LIMIT).contains(&max_retries)
        {
            bail!(
                "Invalid config value for `max_retries`: {max_retries}. Expected range: 1..={MAX_RETRIES_LIMIT}"
            );
        }
        validate_secs_f64("wait_secs", self.wait_secs, MAX_WAIT_SECS)?;
        validate_secs_f64("retry_base_delay_secs", self.retry_base_delay_secs, 300.0)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(bulk_wait) = self.bulk_wait_secs
            && bulk_wait > 3600
        {
            bail!("Invalid config value for `bulk_wait_secs`: {bulk_wait}. Expected range: 0..=3600");
        }
        Ok(())
    }
}

fn validate_secs_f64(field: &str, value: Option<f64>, max: f64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !value.is_finite() || !(0.0..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 0..={max}");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory for Wayback downloads.
    pub output_dir: PathBuf,
    /// Attempts per URL (at least 1).
    pub max_retries: u32,
    /// Pause between downloads.
    pub wait: Duration,
    /// Base delay of the retry backoff.
    pub retry_base_delay: Duration,
    /// HTTP connect timeout.
    pub connect_timeout: Duration,
    /// HTTP read timeout.
    pub read_timeout: Duration,
    /// Target directory for Spotify downloads.
    pub spotify_target_dir: PathBuf,
    /// zotify's pause between tracks, in seconds.
    pub bulk_wait_secs: u64,
    /// Verbosity from the config file, if any.
    pub verbosity: Option<VerbositySetting>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_retries: DEFAULT_MAX_RETRIES,
            wait: DEFAULT_INTER_ITEM_WAIT,
            retry_base_delay: DEFAULT_BASE_DELAY,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            spotify_target_dir: PathBuf::from(DEFAULT_SPOTIFY_TARGET_DIR),
            bulk_wait_secs: DEFAULT_BULK_WAIT_SECS,
            verbosity: None,
        }
    }
}

impl Settings {
    /// Built-in defaults overlaid with the config file, if any.
    #[must_use]
    pub fn from_file(file_config: Option<&FileConfig>) -> Self {
        let mut settings = Self::default();
        let Some(file) = file_config else {
            return settings;
        };

        if let Some(output_dir) = &file.output_dir {
            settings.output_dir.clone_from(output_dir);
        }
        if let Some(max_retries) = file.max_retries {
            settings.max_retries = max_retries;
        }
        if let Some(wait) = file.wait_secs {
            settings.wait = Duration::from_secs_f64(wait);
        }
        if let Some(delay) = file.retry_base_delay_secs {
            settings.retry_base_delay = Duration::from_secs_f64(delay);
        }
        if let Some(secs) = file.connect_timeout_secs {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.read_timeout_secs {
            settings.read_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &file.spotify_target_dir {
            settings.spotify_target_dir.clone_from(dir);
        }
        if let Some(bulk_wait) = file.bulk_wait_secs {
            settings.bulk_wait_secs = bulk_wait;
        }
        settings.verbosity = file.verbosity;
        settings
    }

    /// Loads the default config file (if present) and resolves settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or is invalid.
    pub fn load() -> Result<Self> {
        let loaded = load_default_file_config()?;
        Ok(Self::from_file(loaded.config.as_ref()))
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/cratedigger/config.toml`
/// 2. `$HOME/.config/cratedigger/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path) if path.exists() => Some(load_file_config(path)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Reads and parses a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "max_retries" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_retries out of range for u32"))
                    .with_context(context)?;
                cfg.max_retries = Some(n);
            }
            "wait_secs" => {
                cfg.wait_secs = Some(parse_number(value).with_context(context)?);
            }
            "retry_base_delay_secs" => {
                cfg.retry_base_delay_secs = Some(parse_number(value).with_context(context)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "spotify_target_dir" => {
                cfg.spotify_target_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "bulk_wait_secs" => {
                cfg.bulk_wait_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_number(raw_value: &str) -> Result<f64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected numeric value");
    }
    Ok(token.parse::<f64>()?)
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        _ => bail!("Expected one of: default, verbose, quiet"),
    }
}
