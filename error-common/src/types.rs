use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad failure category shared by every error type in the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed request: a required field is missing or empty
    Validation,
    /// Arguments could not be decoded into the expected shape
    Decode,
    /// A backing lookup exceeded the caller's deadline or was cancelled
    Timeout,
    /// A backing store could not be reached or answered with garbage
    Unavailable,
    /// Invalid configuration or seed data
    Configuration,
    /// Anything else
    Internal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation",
            ErrorClass::Decode => "decode",
            ErrorClass::Timeout => "timeout",
            ErrorClass::Unavailable => "unavailable",
            ErrorClass::Configuration => "configuration",
            ErrorClass::Internal => "internal",
        }
    }

    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Timeout | ErrorClass::Unavailable)
    }

    /// Caller mistakes are never reported as security events.
    pub fn is_security_event(&self) -> bool {
        !matches!(
            self,
            ErrorClass::Validation | ErrorClass::Decode | ErrorClass::Configuration
        )
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by error enums so callers can classify them without matching variants
pub trait Classified {
    fn class(&self) -> ErrorClass;

    /// Stable code from [`crate::codes`]
    fn code(&self) -> &'static str;
}

/// Emit a structured log line for a classified error
pub fn log_error<E>(context: &str, error: &E)
where
    E: Classified + fmt::Display,
{
    let class = error.class();
    if class.is_security_event() {
        tracing::warn!(
            context = context,
            error_class = %class,
            error_code = error.code(),
            error = %error,
            "request failed"
        );
    } else {
        tracing::debug!(
            context = context,
            error_class = %class,
            error_code = error.code(),
            error = %error,
            "request rejected"
        );
    }
}
