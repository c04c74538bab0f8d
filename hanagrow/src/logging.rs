//! Tracing subscriber setup.

use chrono::Local;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{Error, Result};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "hanagrow=info,hanafuda_api=info";

/// Local-timezone timestamps.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Pick the filter for the given verbosity flags.
///
/// `quiet` wins over `verbose`; with neither, `RUST_LOG` is honoured and
/// [`DEFAULT_LOG_FILTER`] is the fallback.
pub fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("hanagrow=debug,hanafuda_api=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

pub fn init_logging(verbose: bool, quiet: bool, ansi: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_ansi(ansi)
                .with_timer(LocalTimer)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set global default subscriber: {e}")))
}
