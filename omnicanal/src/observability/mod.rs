//! Logging initialisation
//!
//! Installs a `tracing` subscriber with an environment-driven filter and a
//! pretty (development) or JSON (production) formatter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingSettings};

/// Build the log filter
///
/// `RUST_LOG` wins when set; otherwise the configured level applies.
///
/// # Errors
///
/// Returns an error if the configured level is not a valid filter directive.
pub fn env_filter(settings: &LoggingSettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&settings.level)?),
    }
}

/// Initialize logging
///
/// # Example
///
/// ```rust,no_run
/// use omnicanal::config::OmnicanalConfig;
/// use omnicanal::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// let config = OmnicanalConfig::load()?;
/// observability::init(&config.logging, config.log_format())?;
/// tracing::info!("Application started");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init(settings: &LoggingSettings, format: LogFormat) -> anyhow::Result<()> {
    let filter = env_filter(settings)?;

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    Ok(())
}
