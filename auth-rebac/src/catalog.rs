use crate::{error::CatalogError, models::*};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shared cancellation signal, set by the host when an evaluation is abandoned
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation signal of the evaluation a lookup belongs to
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    deadline: Option<Instant>,
    cancellation: Option<CancellationFlag>,
}

impl LookupContext {
    /// No deadline, no cancellation
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancellation: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail if the evaluation was cancelled or its deadline has passed.
    pub fn ensure_active(&self, key: &str) -> Result<(), CatalogError> {
        if self.cancellation.as_ref().is_some_and(CancellationFlag::is_cancelled) {
            return Err(CatalogError::Cancelled { key: key.to_string() });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(CatalogError::Timeout { key: key.to_string() });
            }
        }
        Ok(())
    }
}

/// Read-only data access for identities and resources.
///
/// `key` may be a canonical ID or an alias. Implementations backed by a remote
/// directory must honour `ctx` and report failures as [`CatalogError`], never as
/// `Ok(None)`.
#[cfg_attr(test, mockall::automock)]
pub trait Catalog: Send + Sync {
    fn get_identity(&self, key: &str, ctx: &LookupContext) -> Result<Option<Identity>, CatalogError>;

    fn get_resource(&self, key: &str, ctx: &LookupContext) -> Result<Option<Resource>, CatalogError>;
}

/// Identity entry of a catalog seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySeed {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Resource entry of a catalog seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSeed {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Serialized catalog contents (YAML or JSON)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub identities: Vec<IdentitySeed>,
    #[serde(default)]
    pub resources: Vec<ResourceSeed>,
}

/// Records keyed by canonical ID plus an alias table pointing at canonical IDs.
///
/// Aliases never hold a copy of a record, so resolving through an alias always yields
/// exactly the record stored under the canonical ID.
#[derive(Debug, Clone)]
struct AliasedTable<T> {
    records: HashMap<String, T>,
    aliases: HashMap<String, String>,
}

impl<T> Default for AliasedTable<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            aliases: HashMap::new(),
        }
    }
}

impl<T> AliasedTable<T> {
    fn canonical_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.aliases.get(key).map(String::as_str).unwrap_or(key)
    }

    fn get(&self, key: &str) -> Option<&T> {
        self.records.get(self.canonical_key(key))
    }

    fn insert_record(&mut self, what: &str, id: &str, record: T) -> Result<(), CatalogError> {
        if id.is_empty() {
            return Err(CatalogError::InvalidSeed(format!("{} with empty id", what)));
        }
        if self.records.insert(id.to_string(), record).is_some() {
            return Err(CatalogError::InvalidSeed(format!("duplicate {} id '{}'", what, id)));
        }
        Ok(())
    }

    fn insert_alias(&mut self, what: &str, alias: &str, canonical: &str) -> Result<(), CatalogError> {
        if alias.is_empty() {
            return Err(CatalogError::InvalidSeed(format!("empty alias for {} '{}'", what, canonical)));
        }
        if alias == canonical {
            return Ok(());
        }
        if self.records.contains_key(alias) {
            return Err(CatalogError::InvalidSeed(format!(
                "alias '{}' of {} '{}' shadows the canonical id of another {}",
                alias, what, canonical, what
            )));
        }
        match self.aliases.get(alias) {
            Some(existing) if existing != canonical => Err(CatalogError::InvalidSeed(format!(
                "alias '{}' is bound to both {} '{}' and '{}'",
                alias, what, existing, canonical
            ))),
            _ => {
                self.aliases.insert(alias.to_string(), canonical.to_string());
                Ok(())
            }
        }
    }

    fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records
            .keys()
            .map(|id| (id.as_str(), id.as_str()))
            .chain(self.aliases.iter().map(|(alias, id)| (alias.as_str(), id.as_str())))
    }
}

/// In-process catalog built once and never mutated afterwards
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    identities: AliasedTable<Identity>,
    resources: AliasedTable<Resource>,
}

impl InMemoryCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Result<Self, CatalogError> {
        let mut builder = Self::builder();
        for entry in seed.identities {
            builder = builder.identity(entry.identity, entry.aliases);
        }
        for entry in seed.resources {
            builder = builder.resource(entry.resource, entry.aliases);
        }
        builder.build()
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, CatalogError> {
        let seed: CatalogSeed = serde_yaml::from_str(source)
            .map_err(|e| CatalogError::InvalidSeed(e.to_string()))?;
        Self::from_seed(seed)
    }

    pub fn from_json_str(source: &str) -> Result<Self, CatalogError> {
        let seed: CatalogSeed = serde_json::from_str(source)
            .map_err(|e| CatalogError::InvalidSeed(e.to_string()))?;
        Self::from_seed(seed)
    }

    /// Load a seed file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::InvalidSeed(format!("cannot read {}: {}", path.display(), e))
        })?;

        let catalog = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source)?,
            _ => Self::from_yaml_str(&source)?,
        };
        info!(
            path = %path.display(),
            identities = catalog.identity_count(),
            resources = catalog.resource_count(),
            "Loaded catalog seed"
        );
        Ok(catalog)
    }

    /// Reference data set: three identities and three resources, each reachable by a
    /// human-readable alias and by its canonical ID.
    pub fn fixture() -> Self {
        let entries = [
            (Identity::new("UUID-1", IdentityKind::User).with_orgs(["UUID-1", "UUID-2"]), "USER-1"),
            (Identity::new("UUID-2", IdentityKind::HoldingCompany), "HOLDING_COMPANY-1"),
            (Identity::new("UUID-3", IdentityKind::Advertiser), "ADVERTISER-1"),
        ];
        let mut catalog = Self::default();
        for (identity, alias) in entries {
            let id = identity.id.clone();
            catalog.identities.records.insert(id.clone(), identity);
            catalog.identities.aliases.insert(alias.to_string(), id);
        }

        let entries = [
            (
                Resource::new("UUID-1", ResourceKind::Audience, "UUID-1")
                    .with_permissions(["DMP.AUDIENCE.READ"]),
                "AUD-1",
            ),
            (
                Resource::new("UUID-2", ResourceKind::Pixel, "UUID-2")
                    .with_permissions(["DIGITAL.PIXEL.READ"]),
                "PIXEL-1",
            ),
            (
                Resource::new("UUID-3", ResourceKind::Report, "UUID-3")
                    .with_permissions(["REPORTING.EMBEDS.READ"]),
                "REPORT-1",
            ),
        ];
        for (resource, alias) in entries {
            let id = resource.id.clone();
            catalog.resources.records.insert(id.clone(), resource);
            catalog.resources.aliases.insert(alias.to_string(), id);
        }
        catalog
    }

    pub fn identity_count(&self) -> usize {
        self.identities.records.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.records.len()
    }

    /// Alias resolution step: map any lookup key to the canonical identity ID it names
    pub fn canonical_identity_id<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        let canonical = self.identities.canonical_key(key);
        self.identities.records.contains_key(canonical).then_some(canonical)
    }

    pub fn canonical_resource_id<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        let canonical = self.resources.canonical_key(key);
        self.resources.records.contains_key(canonical).then_some(canonical)
    }

    /// Every identity lookup key with the canonical ID it maps to
    pub fn identity_keys(&self) -> Vec<(String, String)> {
        self.identities
            .keys()
            .map(|(key, id)| (key.to_string(), id.to_string()))
            .collect()
    }

    /// Every resource lookup key with the canonical ID it maps to
    pub fn resource_keys(&self) -> Vec<(String, String)> {
        self.resources
            .keys()
            .map(|(key, id)| (key.to_string(), id.to_string()))
            .collect()
    }
}

impl Catalog for InMemoryCatalog {
    fn get_identity(&self, key: &str, _ctx: &LookupContext) -> Result<Option<Identity>, CatalogError> {
        Ok(self.identities.get(key).cloned())
    }

    fn get_resource(&self, key: &str, _ctx: &LookupContext) -> Result<Option<Resource>, CatalogError> {
        Ok(self.resources.get(key).cloned())
    }
}

/// Collects records and aliases, validating them on [`CatalogBuilder::build`]
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    identities: Vec<(Identity, Vec<String>)>,
    resources: Vec<(Resource, Vec<String>)>,
}

impl CatalogBuilder {
    pub fn identity<I, S>(mut self, identity: Identity, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identities
            .push((identity, aliases.into_iter().map(Into::into).collect()));
        self
    }

    pub fn resource<I, S>(mut self, resource: Resource, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources
            .push((resource, aliases.into_iter().map(Into::into).collect()));
        self
    }

    pub fn build(self) -> Result<InMemoryCatalog, CatalogError> {
        let mut catalog = InMemoryCatalog::default();

        // Records first, so alias checks see every canonical ID.
        let mut identity_aliases = Vec::new();
        for (identity, aliases) in self.identities {
            let id = identity.id.clone();
            catalog.identities.insert_record("identity", &id, identity)?;
            identity_aliases.push((id, aliases));
        }
        let mut resource_aliases = Vec::new();
        for (resource, aliases) in self.resources {
            let id = resource.id.clone();
            catalog.resources.insert_record("resource", &id, resource)?;
            resource_aliases.push((id, aliases));
        }

        for (id, aliases) in identity_aliases {
            for alias in aliases {
                catalog.identities.insert_alias("identity", &alias, &id)?;
            }
        }
        for (id, aliases) in resource_aliases {
            for alias in aliases {
                catalog.resources.insert_alias("resource", &alias, &id)?;
            }
        }

        debug!(
            identities = catalog.identity_count(),
            resources = catalog.resource_count(),
            "Built in-memory catalog"
        );
        Ok(catalog)
    }
}

/// Holder for the current catalog snapshot.
///
/// An external process may publish a new snapshot at any time with
/// [`SharedCatalog::replace`]; a caller that pinned a snapshot keeps seeing it unchanged.
pub struct SharedCatalog {
    current: RwLock<Arc<dyn Catalog>>,
}

impl SharedCatalog {
    pub fn new(initial: impl Catalog + 'static) -> Self {
        Self::from_arc(Arc::new(initial))
    }

    pub fn from_arc(initial: Arc<dyn Catalog>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Pin the current snapshot
    pub fn snapshot(&self) -> Arc<dyn Catalog> {
        self.current.read().clone()
    }

    /// Publish a new snapshot and return the previous one
    pub fn replace(&self, next: impl Catalog + 'static) -> Arc<dyn Catalog> {
        let next: Arc<dyn Catalog> = Arc::new(next);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        info!("Catalog snapshot replaced");
        previous
    }
}

impl std::fmt::Debug for SharedCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCatalog").finish_non_exhaustive()
    }
}
