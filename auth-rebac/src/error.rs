use error_common::{codes, Classified, ErrorClass};
use thiserror::Error;

/// Failures of the catalog backing store.
///
/// None of these may ever be turned into a "not found" answer: a lookup that did not
/// complete says nothing about whether the record exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog lookup for '{key}' exceeded the evaluation deadline")]
    Timeout { key: String },

    #[error("Catalog lookup for '{key}' was cancelled")]
    Cancelled { key: String },

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Catalog transport error: {0}")]
    Transport(String),

    #[error("Invalid catalog seed: {0}")]
    InvalidSeed(String),
}

impl Classified for CatalogError {
    fn class(&self) -> ErrorClass {
        match self {
            CatalogError::Timeout { .. } | CatalogError::Cancelled { .. } => ErrorClass::Timeout,
            CatalogError::Unavailable(_) | CatalogError::Transport(_) => ErrorClass::Unavailable,
            CatalogError::InvalidSeed(_) => ErrorClass::Configuration,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CatalogError::Timeout { .. } => codes::catalog::LOOKUP_TIMEOUT,
            CatalogError::Cancelled { .. } => codes::catalog::LOOKUP_CANCELLED,
            CatalogError::Unavailable(_) => codes::catalog::BACKEND_UNAVAILABLE,
            CatalogError::Transport(_) => codes::catalog::TRANSPORT_FAILURE,
            CatalogError::InvalidSeed(_) => codes::catalog::INVALID_SEED,
        }
    }
}

#[derive(Error, Debug)]
pub enum RebacError {
    #[error("{field} is required")]
    InvalidArgument { field: &'static str },

    #[error("Cannot decode arguments: {0}")]
    Decode(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RebacError {
    pub fn invalid_argument(field: &'static str) -> Self {
        RebacError::InvalidArgument { field }
    }

    /// Name of the missing field for `InvalidArgument` errors
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            RebacError::InvalidArgument { field } => Some(*field),
            _ => None,
        }
    }
}

impl Classified for RebacError {
    fn class(&self) -> ErrorClass {
        match self {
            RebacError::InvalidArgument { .. } => ErrorClass::Validation,
            RebacError::Decode(_) => ErrorClass::Decode,
            RebacError::Catalog(e) => e.class(),
            RebacError::Configuration(_) => ErrorClass::Configuration,
            RebacError::Internal(_) => ErrorClass::Internal,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            RebacError::InvalidArgument { .. } => codes::validation::MISSING_REQUIRED_FIELD,
            RebacError::Decode(_) => codes::validation::UNDECODABLE_ARGUMENT,
            RebacError::Catalog(e) => e.code(),
            RebacError::Configuration(_) => codes::configuration::INVALID_CONFIGURATION,
            RebacError::Internal(_) => codes::internal::INTERNAL_ERROR,
        }
    }
}

impl From<serde_json::Error> for RebacError {
    fn from(err: serde_json::Error) -> Self {
        RebacError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for RebacError {
    fn from(err: config::ConfigError) -> Self {
        RebacError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RebacError>;
