//! Relationship-based access control decision core
//!
//! This crate answers one question for a policy host: does a subject hold a named
//! relation on an object? It provides:
//! - Identity and resource resolution from aliases or canonical IDs
//! - Relation checks driven by a table of named rules (`owner`, `member` by default)
//! - Deny-by-default decisions with a human-readable reason
//! - Builtin registration for hosts (`va.v1.identity`, `va.v1.resource`, `va.v1.check`)
//!
//! # Core Concepts
//!
//! - **Identity**: a subject (user, holding company, advertiser) with the orgs it belongs to
//! - **Resource**: a protected object (audience, pixel, report) with a single owner
//! - **Relation**: a named rule over a resolved (resource, identity) pair
//! - **Catalog**: read-only lookup of identities and resources, in memory or remote
//!
//! Unknown identifiers are answers, not errors. Errors are reserved for malformed
//! requests and catalog failures, and a catalog failure never turns into a denial.
//!
//! # Example
//!
//! ```rust
//! use auth_rebac::{AuthorizationEngine, CheckRequest, InMemoryCatalog};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AuthorizationEngine::new(InMemoryCatalog::fixture());
//!
//!     let (id, message) = engine.resolve_identity("USER-1")?.into_parts();
//!     assert_eq!(id, "UUID-1");
//!     assert_eq!(message, "User found with id 'USER-1'");
//!
//!     let decision = engine.check(&CheckRequest::new(
//!         "AUDIENCE", "AUD-1", "owner", "USER", "USER-1",
//!     ))?;
//!     assert!(decision.allowed);
//!
//!     Ok(())
//! }
//! ```

pub mod builtins;
pub mod catalog;
pub mod check;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod relations;
pub mod resolver;

pub use builtins::*;
pub use catalog::*;
pub use check::*;
pub use crate::config::{EngineConfig, ENV_PREFIX};
pub use engine::*;
pub use error::*;
pub use models::*;
pub use relations::*;
