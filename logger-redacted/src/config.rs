// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Replace subject and object identifiers in audit events with correlation hashes
    pub redact_identifiers: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            redact_identifiers: false,
        }
    }
}
