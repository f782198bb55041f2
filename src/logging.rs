//! Logging configuration.
//!
//! Diagnostics always go to stderr because stdout carries the single result
//! line read by the calling process. A daily-rolling log file can be added on
//! top through `[logging] file_dir`.

use anyhow::{anyhow, Result};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Environment variable holding the log filter, e.g. `IMAGE_RETRIEVAL_LOG=debug`.
pub const LOG_ENV: &str = "IMAGE_RETRIEVAL_LOG";

static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initialize the logging system.
///
/// Filter precedence: `IMAGE_RETRIEVAL_LOG`, then `RUST_LOG`, then the
/// configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A bad file directory only costs the file layer; stderr stays up
    let (file_layer, file_error) = match &config.file_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(dir, "image-retrieval.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Flushes on drop, so it has to live until process exit
                let _ = FILE_GUARD.set(guard);

                (Some(fmt::layer().with_writer(non_blocking).with_ansi(false)), None)
            }
            Err(e) => (None, Some(e)),
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))?;

    if let Some(dir) = &config.file_dir {
        match file_error {
            Some(e) => tracing::warn!("Log file disabled, cannot create {:?}: {}", dir, e),
            None => tracing::debug!("Logging initialized with file backend at {:?}", dir),
        }
    }
    Ok(())
}
