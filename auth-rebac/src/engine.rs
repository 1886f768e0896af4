use crate::{
    catalog::{Catalog, InMemoryCatalog, LookupContext, SharedCatalog},
    check::RelationshipChecker,
    config::EngineConfig,
    error::{RebacError, Result},
    models::*,
    relations::RelationTable,
    resolver,
};
use dashmap::DashMap;
use error_common::log_error;
use logger_redacted::{DecisionAuditor, DecisionRecord};
use std::sync::Arc;
use tracing::debug;

enum CatalogSource {
    Fixed(Arc<dyn Catalog>),
    Shared(Arc<SharedCatalog>),
}

impl CatalogSource {
    fn snapshot(&self) -> Arc<dyn Catalog> {
        match self {
            CatalogSource::Fixed(catalog) => catalog.clone(),
            CatalogSource::Shared(shared) => shared.snapshot(),
        }
    }
}

/// Entry point for hosts: owns the catalog, the relation table and the audit sink.
///
/// The engine holds no per-request state. It is `Send + Sync` and meant to be shared
/// behind an `Arc` by every concurrent evaluation.
pub struct AuthorizationEngine {
    catalog: CatalogSource,
    checker: RelationshipChecker,
    auditor: DecisionAuditor,
    config: EngineConfig,
}

impl AuthorizationEngine {
    /// Engine over a fixed catalog with default configuration and relations
    pub fn new(catalog: impl Catalog + 'static) -> Self {
        Self::from_source(CatalogSource::Fixed(Arc::new(catalog)))
    }

    /// Engine over a swappable catalog
    pub fn with_shared_catalog(shared: Arc<SharedCatalog>) -> Self {
        Self::from_source(CatalogSource::Shared(shared))
    }

    /// Build from configuration; `catalog_path` is required and loaded into a
    /// [`SharedCatalog`].
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let path = config.catalog_path.as_ref().ok_or_else(|| {
            RebacError::Configuration("catalog_path is required".to_string())
        })?;
        let catalog = InMemoryCatalog::load(path)?;
        let shared = Arc::new(SharedCatalog::new(catalog));
        Ok(Self::with_shared_catalog(shared).with_config(config))
    }

    fn from_source(catalog: CatalogSource) -> Self {
        let config = EngineConfig::default();
        Self {
            catalog,
            checker: RelationshipChecker::default(),
            auditor: DecisionAuditor::from_config(&config.logging),
            config,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.auditor = DecisionAuditor::from_config(&config.logging);
        self.config = config;
        self
    }

    /// Replace the relation table
    pub fn with_relations(mut self, relations: RelationTable) -> Self {
        self.checker = RelationshipChecker::new(Arc::new(relations));
        self
    }

    pub fn with_auditor(mut self, auditor: DecisionAuditor) -> Self {
        self.auditor = auditor;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn relations(&self) -> &RelationTable {
        self.checker.relations()
    }

    /// Pin the current catalog snapshot
    pub fn snapshot(&self) -> Arc<dyn Catalog> {
        self.catalog.snapshot()
    }

    /// Fresh lookup context carrying the configured timeout
    pub fn lookup_context(&self) -> LookupContext {
        match self.config.lookup_timeout() {
            Some(timeout) => LookupContext::with_timeout(timeout),
            None => LookupContext::unbounded(),
        }
    }

    // =============================================================================
    // Single calls
    // =============================================================================

    pub fn resolve_identity(&self, id: &str) -> Result<Resolution> {
        self.single_call().resolve_identity(id)
    }

    pub fn resolve_resource(&self, id: &str) -> Result<Resolution> {
        self.single_call().resolve_resource(id)
    }

    pub fn check(&self, request: &CheckRequest) -> Result<Decision> {
        self.single_call().check(request)
    }

    fn single_call(&self) -> Evaluation<'_> {
        Evaluation::new(self, self.lookup_context(), false)
    }

    // =============================================================================
    // Evaluations
    // =============================================================================

    /// Start a host evaluation with the configured timeout
    pub fn evaluation(&self) -> Evaluation<'_> {
        self.evaluation_with(self.lookup_context())
    }

    /// Start a host evaluation with the caller's deadline and cancellation signal
    pub fn evaluation_with(&self, ctx: LookupContext) -> Evaluation<'_> {
        Evaluation::new(self, ctx, self.config.memoize)
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("relations", &self.relations().names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MemoKey {
    Identity(String),
    Resource(String),
    Check(CheckRequest),
}

#[derive(Debug, Clone)]
enum Memoized {
    Resolution(Resolution),
    Decision(Decision),
}

/// One host policy evaluation.
///
/// Pins a single catalog snapshot for its whole lifetime, so repeated identical calls
/// see the same data and may be answered from the memo table. Only successful results
/// are memoized, and a decision answered from the memo table is audited like a fresh one.
pub struct Evaluation<'e> {
    engine: &'e AuthorizationEngine,
    snapshot: Arc<dyn Catalog>,
    ctx: LookupContext,
    memo: Option<DashMap<MemoKey, Memoized>>,
}

impl<'e> Evaluation<'e> {
    fn new(engine: &'e AuthorizationEngine, ctx: LookupContext, memoize: bool) -> Self {
        Self {
            engine,
            snapshot: engine.snapshot(),
            ctx,
            memo: memoize.then(DashMap::new),
        }
    }

    pub fn context(&self) -> &LookupContext {
        &self.ctx
    }

    pub fn is_memoizing(&self) -> bool {
        self.memo.is_some()
    }

    /// Number of memoized results
    pub fn memoized(&self) -> usize {
        self.memo.as_ref().map_or(0, DashMap::len)
    }

    pub fn resolve_identity(&self, id: &str) -> Result<Resolution> {
        let key = MemoKey::Identity(id.to_string());
        if let Some(Memoized::Resolution(hit)) = self.recall(&key) {
            return Ok(hit);
        }

        let resolution = resolver::resolve_identity(self.snapshot.as_ref(), &self.ctx, id)
            .map_err(|e| {
                log_error("resolve_identity", &e);
                e
            })?;
        self.remember(key, Memoized::Resolution(resolution.clone()));
        Ok(resolution)
    }

    pub fn resolve_resource(&self, id: &str) -> Result<Resolution> {
        let key = MemoKey::Resource(id.to_string());
        if let Some(Memoized::Resolution(hit)) = self.recall(&key) {
            return Ok(hit);
        }

        let resolution = resolver::resolve_resource(self.snapshot.as_ref(), &self.ctx, id)
            .map_err(|e| {
                log_error("resolve_resource", &e);
                e
            })?;
        self.remember(key, Memoized::Resolution(resolution.clone()));
        Ok(resolution)
    }

    /// Decide `request`. Every returned decision is audited, memo hits included.
    pub fn check(&self, request: &CheckRequest) -> Result<Decision> {
        let key = MemoKey::Check(request.clone());
        if let Some(Memoized::Decision(hit)) = self.recall(&key) {
            self.audit(request, &hit);
            return Ok(hit);
        }

        let decision = self
            .engine
            .checker
            .check(self.snapshot.as_ref(), &self.ctx, request)
            .map_err(|e| {
                log_error("check", &e);
                e
            })?;

        self.audit(request, &decision);
        self.remember(key, Memoized::Decision(decision.clone()));
        Ok(decision)
    }

    fn audit(&self, request: &CheckRequest, decision: &Decision) {
        self.engine.auditor.record(&DecisionRecord {
            object_type: &request.object_type,
            object_id: &request.object_id,
            relation: &request.relation,
            subject_type: &request.subject_type,
            subject_id: &request.subject_id,
            allowed: decision.allowed,
            outcome: decision.outcome.as_str(),
            reason: &decision.message,
        });
    }

    fn recall(&self, key: &MemoKey) -> Option<Memoized> {
        let hit = self.memo.as_ref()?.get(key).map(|entry| entry.value().clone());
        if hit.is_some() {
            debug!(key = ?key, "Memo hit");
        }
        hit
    }

    fn remember(&self, key: MemoKey, value: Memoized) {
        if let Some(memo) = &self.memo {
            memo.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MockCatalog;
    use crate::error::CatalogError;
    use crate::relations::RelationRule;

    fn engine() -> AuthorizationEngine {
        AuthorizationEngine::new(InMemoryCatalog::fixture())
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthorizationEngine>();
        assert_send_sync::<Evaluation<'static>>();
    }

    #[test]
    fn test_single_calls() {
        let engine = engine();

        let (id, message) = engine.resolve_identity("ADVERTISER-1").unwrap().into_parts();
        assert_eq!(id, "UUID-3");
        assert_eq!(message, "Advertiser found with id 'ADVERTISER-1'");

        let (id, _) = engine.resolve_resource("REPORT-1").unwrap().into_parts();
        assert_eq!(id, "UUID-3");

        let (allowed, message) = engine
            .check(&CheckRequest::new("REPORT", "REPORT-1", "owner", "ADVERTISER", "ADVERTISER-1"))
            .unwrap()
            .into_parts();
        assert!(allowed);
        assert_eq!(message, "ADVERTISER 'UUID-3' is the owner of resource 'UUID-3'");
    }

    #[test]
    fn test_evaluation_memoizes_successes() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_get_identity()
            .times(1)
            .returning(|_, _| Ok(Some(Identity::new("UUID-1", IdentityKind::User))));
        let engine = AuthorizationEngine::new(catalog);

        let evaluation = engine.evaluation();
        let first = evaluation.resolve_identity("USER-1").unwrap();
        let second = evaluation.resolve_identity("USER-1").unwrap();

        assert_eq!(first, second);
        assert_eq!(evaluation.memoized(), 1);
    }

    #[test]
    fn test_evaluation_does_not_memoize_failures() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_get_resource()
            .times(2)
            .returning(|_, _| Err(CatalogError::Unavailable("directory down".into())));
        let engine = AuthorizationEngine::new(catalog);

        let evaluation = engine.evaluation();
        assert!(evaluation.resolve_resource("AUD-1").is_err());
        assert!(evaluation.resolve_resource("AUD-1").is_err());
        assert_eq!(evaluation.memoized(), 0);
    }

    #[test]
    fn test_memoization_can_be_disabled() {
        let engine = engine().with_config(EngineConfig {
            memoize: false,
            ..Default::default()
        });

        let evaluation = engine.evaluation();
        evaluation.resolve_identity("USER-1").unwrap();
        assert!(!evaluation.is_memoizing());
        assert_eq!(evaluation.memoized(), 0);
    }

    #[test]
    fn test_custom_relation_without_touching_resolution() {
        let engine = engine().with_relations(RelationTable::default().with_rule(RelationRule::new(
            "reader",
            |resource, _| resource.permissions.iter().any(|p| p.ends_with(".READ")),
            "{{subject_kind}} '{{subject_id}}' may read {{resource_kind}} '{{resource_id}}'",
        )));

        let decision = engine
            .check(&CheckRequest::new("PIXEL", "PIXEL-1", "reader", "ADVERTISER", "ADVERTISER-1"))
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.message, "ADVERTISER 'UUID-3' may read PIXEL 'UUID-2'");
    }

    #[test]
    fn test_from_config_requires_catalog_path() {
        let err = AuthorizationEngine::from_config(EngineConfig::default()).unwrap_err();
        assert!(matches!(err, RebacError::Configuration(_)));
    }

    #[test]
    fn test_memoized_decisions_are_audited() {
        use std::io;
        use std::sync::Mutex;

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let engine = engine();
        let request = CheckRequest::new("AUDIENCE", "AUD-1", "owner", "USER", "USER-1");
        tracing::subscriber::with_default(subscriber, || {
            let evaluation = engine.evaluation();
            evaluation.check(&request).unwrap();
            evaluation.check(&request).unwrap();
            assert_eq!(evaluation.memoized(), 1);
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("access granted").count(), 2);
    }
}
