use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::StartupError;

/// Installs a subscriber that writes every event to the console and to `log_path`.
/// The log file is truncated at start so it reflects a single run.
pub fn init(log_path: &Path) -> Result<(), StartupError> {
    let file = File::create(log_path).map_err(|_| StartupError {
        code: "ERR_LOG_INIT",
        message: format!("failed to open log file at {}", log_path.display()),
    })?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Arc::new(file)),
        )
        .try_init()
        .map_err(|err| StartupError {
            code: "ERR_LOG_INIT",
            message: format!("failed to install log subscriber: {}", err),
        })
}
