//! Tracing subscriber setup shared by the binaries.

use tracing_subscriber::EnvFilter;

use crate::config::VerbositySetting;

/// Picks the default filter directive from CLI flags and the config file.
///
/// Priority: quiet flag > verbose flag > config verbosity > `info`.
/// `RUST_LOG`, when set, overrides the result in [`init`].
#[must_use]
pub fn default_level(verbose: u8, quiet: bool, configured: Option<VerbositySetting>) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => match configured {
            Some(VerbositySetting::Quiet) => "error",
            Some(VerbositySetting::Verbose) => "debug",
            Some(VerbositySetting::Default) | None => "info",
        },
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global fmt subscriber writing to stderr.
///
/// Stdout is left for program output. Calling this twice is a no-op.
pub fn init(verbose: u8, quiet: bool, configured: Option<VerbositySetting>) {
    let level = default_level(verbose, quiet, configured);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
