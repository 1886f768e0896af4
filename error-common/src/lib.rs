//! Common error handling utilities for the ReBAC workspace
//!
//! Every crate defines its own `thiserror` enum; this crate gives them a shared
//! vocabulary:
//!
//! - **Error Codes**: stable string codes for host-facing errors
//! - **Error Classes**: a small taxonomy answering "is this retryable?" and
//!   "is this a security event?" without matching on crate-specific variants
//!
//! "Not found" is deliberately absent from the taxonomy: an unresolvable identity or
//! resource is a normal decision outcome, not an error.
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, Classified, ErrorClass};
//!
//! #[derive(Debug)]
//! struct MissingField(&'static str);
//!
//! impl std::fmt::Display for MissingField {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{} is required", self.0)
//!     }
//! }
//!
//! impl Classified for MissingField {
//!     fn class(&self) -> ErrorClass {
//!         ErrorClass::Validation
//!     }
//!
//!     fn code(&self) -> &'static str {
//!         codes::validation::MISSING_REQUIRED_FIELD
//!     }
//! }
//!
//! let err = MissingField("relation");
//! assert!(!err.class().is_retryable());
//! error_common::log_error("check", &err);
//! ```

pub mod codes;
pub mod types;

pub use types::*;
