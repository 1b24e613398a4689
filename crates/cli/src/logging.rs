//! Subscriber setup: one filter, a console layer on stderr and a plain-text
//! layer appending to the run log.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

/// Filter directives, e.g. `CLUSTERPRICE_LOG=debug`.
pub const LOG_ENV: &str = "CLUSTERPRICE_LOG";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn init(log_file: &Path) -> Result<(), CliError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot open log file {}: {e}", log_file.display())))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_target(false),
        )
        .try_init()
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot install logger: {e}")))
}
