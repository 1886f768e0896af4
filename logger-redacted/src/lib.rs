//! Logging and decision auditing for the ReBAC decision core
//!
//! - **Subscriber setup**: `init_tracing` installs an env-filtered `tracing`
//!   subscriber with human-readable or JSON output, unless the embedding host
//!   already installed one.
//! - **Decision audit**: every grant and every denial is written as one structured
//!   event on the `rebac::audit` target, carrying the reason string returned to the
//!   caller.
//! - **Identifier redaction**: subject and object identifiers in audit events can be
//!   replaced by stable correlation hashes.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{init_tracing, DecisionAuditor, DecisionRecord, LoggerConfig};
//!
//! let config = LoggerConfig {
//!     redact_identifiers: true,
//!     ..Default::default()
//! };
//! init_tracing(&config).unwrap();
//!
//! let auditor = DecisionAuditor::from_config(&config);
//! auditor.record(&DecisionRecord {
//!     object_type: "AUDIENCE",
//!     object_id: "AUD-1",
//!     relation: "owner",
//!     subject_type: "USER",
//!     subject_id: "USER-1",
//!     allowed: true,
//!     outcome: "relation_granted",
//!     reason: "USER 'UUID-1' is the owner of resource 'UUID-1'",
//! });
//! ```

pub mod audit;
pub mod config;
pub mod redactor;
pub mod subscriber;

pub use audit::*;
pub use config::*;
pub use redactor::*;
pub use subscriber::*;
