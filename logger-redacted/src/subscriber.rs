use crate::config::LoggerConfig;
use error_common::{codes, Classified, ErrorClass};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },
}

impl Classified for LoggerError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }

    fn code(&self) -> &'static str {
        codes::configuration::INVALID_CONFIGURATION
    }
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn build_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| LoggerError::InvalidFilter {
        directive: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Install the global tracing subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, which happens when the
/// embedding host owns logging. That is not an error.
pub fn init_tracing(config: &LoggerConfig) -> Result<bool, LoggerError> {
    let env_filter = build_filter(config)?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .try_init()
            .is_ok()
    };

    if !installed {
        tracing::debug!("global subscriber already installed, keeping it");
    }
    Ok(installed)
}
