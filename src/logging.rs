use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;
use crate::error::{CourtError, Result};

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
/// Output goes to stderr so command output on stdout stays machine-readable.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CourtError::Config(format!("Failed to create log filter: {e}")))?;

    let registry = Registry::default().with(env_filter);

    let result = if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
    };
    result.map_err(|e| CourtError::Config(format!("Failed to install logger: {e}")))?;

    tracing::debug!(level = %config.level, json = config.json, "logging initialized");
    Ok(())
}
