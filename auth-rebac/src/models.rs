use crate::error::{RebacError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category of an identity. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IdentityKind {
    User,
    HoldingCompany,
    Advertiser,
    Other(String),
}

impl IdentityKind {
    pub fn as_str(&self) -> &str {
        match self {
            IdentityKind::User => "USER",
            IdentityKind::HoldingCompany => "HOLDING_COMPANY",
            IdentityKind::Advertiser => "ADVERTISER",
            IdentityKind::Other(kind) => kind,
        }
    }
}

impl From<String> for IdentityKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "USER" => IdentityKind::User,
            "HOLDING_COMPANY" => IdentityKind::HoldingCompany,
            "ADVERTISER" => IdentityKind::Advertiser,
            _ => IdentityKind::Other(kind),
        }
    }
}

impl From<&str> for IdentityKind {
    fn from(kind: &str) -> Self {
        IdentityKind::from(kind.to_string())
    }
}

impl From<IdentityKind> for String {
    fn from(kind: IdentityKind) -> Self {
        match kind {
            IdentityKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a resource. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Audience,
    Pixel,
    Report,
    Other(String),
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Audience => "AUDIENCE",
            ResourceKind::Pixel => "PIXEL",
            ResourceKind::Report => "REPORT",
            ResourceKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ResourceKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "AUDIENCE" => ResourceKind::Audience,
            "PIXEL" => ResourceKind::Pixel,
            "REPORT" => ResourceKind::Report,
            _ => ResourceKind::Other(kind),
        }
    }
}

impl From<&str> for ResourceKind {
    fn from(kind: &str) -> Self {
        ResourceKind::from(kind.to_string())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subject that can be granted access: a user or an organizational entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub kind: IdentityKind,
    /// Organizations this identity belongs to
    #[serde(default)]
    pub orgs: BTreeSet<String>,
}

impl Identity {
    pub fn new(id: &str, kind: impl Into<IdentityKind>) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.into(),
            orgs: BTreeSet::new(),
        }
    }

    pub fn with_orgs<I, S>(mut self, orgs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orgs.extend(orgs.into_iter().map(Into::into));
        self
    }

    pub fn belongs_to(&self, org: &str) -> bool {
        self.orgs.contains(org)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// An object that can be accessed. Every resource has exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub kind: ResourceKind,
    /// Identity or org that owns the resource
    pub owner: String,
    /// Capability strings scoped to this resource; not used by relation checks yet
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl Resource {
    pub fn new(id: &str, kind: impl Into<ResourceKind>, owner: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.into(),
            owner: owner.to_string(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A relation check: does `subject` have `relation` to `object`?
///
/// Fields missing from a decoded request default to empty strings and are rejected by
/// [`CheckRequest::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckRequest {
    pub object_type: String,
    pub object_id: String,
    pub relation: String,
    pub subject_type: String,
    pub subject_id: String,
}

impl CheckRequest {
    pub fn new(
        object_type: &str,
        object_id: &str,
        relation: &str,
        subject_type: &str,
        subject_id: &str,
    ) -> Self {
        Self {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
            relation: relation.to_string(),
            subject_type: subject_type.to_string(),
            subject_id: subject_id.to_string(),
        }
    }

    /// Fail on the first empty field, in declaration order.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("object_type", &self.object_type),
            ("object_id", &self.object_id),
            ("relation", &self.relation),
            ("subject_type", &self.subject_type),
            ("subject_id", &self.subject_id),
        ];
        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((field, _)) => Err(RebacError::invalid_argument(*field)),
            None => Ok(()),
        }
    }
}

impl fmt::Display for CheckRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} {} {} {} {}}}",
            self.object_type, self.object_id, self.relation, self.subject_type, self.subject_id
        )
    }
}

/// Result of resolving a free-form identifier.
///
/// `canonical_id` is empty when nothing matched; that is an answer, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub canonical_id: String,
    pub message: String,
}

impl Resolution {
    pub fn found(&self) -> bool {
        !self.canonical_id.is_empty()
    }

    pub fn into_parts(self) -> (String, String) {
        (self.canonical_id, self.message)
    }
}

/// How a check terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    ObjectNotFound,
    SubjectNotFound,
    RelationGranted,
    DefaultDeny,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::ObjectNotFound => "object_not_found",
            Outcome::SubjectNotFound => "subject_not_found",
            Outcome::RelationGranted => "relation_granted",
            Outcome::DefaultDeny => "default_deny",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer to a [`CheckRequest`]. Every decision carries a reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub message: String,
    pub outcome: Outcome,
}

impl Decision {
    pub fn grant(message: String) -> Self {
        Self {
            allowed: true,
            message,
            outcome: Outcome::RelationGranted,
        }
    }

    pub fn deny(outcome: Outcome, message: String) -> Self {
        Self {
            allowed: false,
            message,
            outcome,
        }
    }

    pub fn into_parts(self) -> (bool, String) {
        (self.allowed, self.message)
    }
}
