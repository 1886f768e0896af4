use crate::error::{RebacError, Result};
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment overrides, e.g. `REBAC__LOOKUP_TIMEOUT_MS=250` or
/// `REBAC__LOGGING__JSON=true`
pub const ENV_PREFIX: &str = "REBAC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Memoize resolver and check results within one evaluation
    pub memoize: bool,
    /// Deadline applied to catalog lookups of every call or evaluation
    pub lookup_timeout_ms: Option<u64>,
    /// Catalog seed loaded when the engine is built from configuration
    pub catalog_path: Option<PathBuf>,
    pub logging: LoggerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memoize: true,
            lookup_timeout_ms: None,
            catalog_path: None,
            logging: LoggerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from an optional file (format chosen by extension) overlaid with
    /// `REBAC__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let loaded: EngineConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookup_timeout_ms == Some(0) {
            return Err(RebacError::Configuration(
                "lookup_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(RebacError::Configuration(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout_ms.map(Duration::from_millis)
    }
}
