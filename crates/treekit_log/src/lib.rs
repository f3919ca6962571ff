//! Logging setup shared by treekit binaries.
//!
//! `TREEKIT_LOG` takes an `EnvFilter` directive string and wins over the
//! command-line verbosity when set.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding an explicit filter directive.
pub const ENV_LOG_FILTER: &str = "TREEKIT_LOG";

#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    #[error("Invalid {ENV_LOG_FILTER} directive: {0}")]
    InvalidFilter(String),
    #[error("Global tracing subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Map `-v` count and `--quiet` onto a maximum level.
///
/// Quiet keeps errors only; the default shows warnings.
pub fn level_from_verbosity(n_verbose: u8, if_quiet: bool) -> Level {
    if if_quiet {
        return Level::ERROR;
    }
    match n_verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn build_filter(
    directive_env: Option<String>,
    n_verbose: u8,
    if_quiet: bool,
) -> Result<EnvFilter, LogInitError> {
    match directive_env {
        Some(directive) if !directive.trim().is_empty() => EnvFilter::try_new(&directive)
            .map_err(|e| LogInitError::InvalidFilter(format!("{directive:?} ({e})"))),
        _ => Ok(EnvFilter::new(
            level_from_verbosity(n_verbose, if_quiet)
                .as_str()
                .to_ascii_lowercase(),
        )),
    }
}

/// Install the global subscriber: compact lines on stderr.
pub fn init_tracing(n_verbose: u8, if_quiet: bool) -> Result<(), LogInitError> {
    let filter = build_filter(std::env::var(ENV_LOG_FILTER).ok(), n_verbose, if_quiet)?;
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
