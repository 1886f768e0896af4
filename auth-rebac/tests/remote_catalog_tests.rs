//! Tests against a catalog standing in for a remote directory
//!
//! A lookup that fails or runs out of time must surface as an error and never as a
//! "not found" answer or a denial.

use auth_rebac::*;
use error_common::Classified;
use mockall::mock;
use std::sync::Arc;
use std::time::{Duration, Instant};

mock! {
    pub RemoteCatalog {}

    impl Catalog for RemoteCatalog {
        fn get_identity(&self, key: &str, ctx: &LookupContext) -> std::result::Result<Option<Identity>, CatalogError>;
        fn get_resource(&self, key: &str, ctx: &LookupContext) -> std::result::Result<Option<Resource>, CatalogError>;
    }
}

fn audience() -> Resource {
    Resource::new("UUID-1", ResourceKind::Audience, "UUID-2")
}

#[test]
fn test_unavailable_directory_is_not_a_denial() {
    let mut catalog = MockRemoteCatalog::new();
    catalog
        .expect_get_resource()
        .returning(|_, _| Err(CatalogError::Unavailable("connection refused".into())));
    let engine = AuthorizationEngine::new(catalog);

    let err = engine
        .check(&CheckRequest::new("AUDIENCE", "AUD-1", "owner", "USER", "USER-1"))
        .unwrap_err();
    assert!(matches!(err, RebacError::Catalog(CatalogError::Unavailable(_))));
    assert!(err.class().is_retryable());

    let err = engine.resolve_resource("AUD-1").unwrap_err();
    assert_eq!(err.code(), error_common::codes::catalog::BACKEND_UNAVAILABLE);
}

#[test]
fn test_transport_failure_on_subject_lookup() {
    let mut catalog = MockRemoteCatalog::new();
    catalog
        .expect_get_resource()
        .withf(|key, _| key == "AUD-1")
        .returning(|_, _| Ok(Some(audience())));
    catalog
        .expect_get_identity()
        .returning(|_, _| Err(CatalogError::Transport("malformed response".into())));
    let engine = AuthorizationEngine::new(catalog);

    let result = engine.check(&CheckRequest::new("AUDIENCE", "AUD-1", "member", "USER", "USER-1"));
    assert!(matches!(
        result,
        Err(RebacError::Catalog(CatalogError::Transport(_)))
    ));
}

#[test]
fn test_expired_deadline_skips_the_lookup() {
    let mut catalog = MockRemoteCatalog::new();
    catalog.expect_get_identity().never();
    catalog.expect_get_resource().never();
    let engine = AuthorizationEngine::new(catalog);

    let evaluation = engine.evaluation_with(LookupContext::with_deadline(Instant::now()));
    let err = evaluation.resolve_identity("USER-1").unwrap_err();
    assert!(matches!(err, RebacError::Catalog(CatalogError::Timeout { .. })));

    let err = evaluation
        .check(&CheckRequest::new("AUDIENCE", "AUD-1", "owner", "USER", "USER-1"))
        .unwrap_err();
    assert!(matches!(err, RebacError::Catalog(CatalogError::Timeout { .. })));
}

#[test]
fn test_cancellation_reaches_the_lookup() {
    let flag = CancellationFlag::new();
    let mut catalog = MockRemoteCatalog::new();

    // The host cancels while the object lookup is in flight
    let in_flight = flag.clone();
    catalog.expect_get_resource().times(1).returning(move |_, _| {
        in_flight.cancel();
        Ok(Some(audience()))
    });
    catalog.expect_get_identity().never();
    let engine = AuthorizationEngine::new(catalog);

    let ctx = LookupContext::with_timeout(Duration::from_secs(30)).with_cancellation(flag);
    let err = engine
        .evaluation_with(ctx)
        .check(&CheckRequest::new("AUDIENCE", "AUD-1", "owner", "USER", "UUID-2"))
        .unwrap_err();
    assert!(matches!(err, RebacError::Catalog(CatalogError::Cancelled { .. })));
}

#[test]
fn test_lookups_receive_the_configured_deadline() {
    let mut catalog = MockRemoteCatalog::new();
    catalog
        .expect_get_identity()
        .withf(|_, ctx| ctx.deadline().is_some())
        .times(1)
        .returning(|_, _| Ok(None));
    let engine = AuthorizationEngine::new(catalog).with_config(EngineConfig {
        lookup_timeout_ms: Some(5_000),
        ..Default::default()
    });

    let resolution = engine.resolve_identity("USER-1").unwrap();
    assert!(!resolution.found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_evaluations_share_one_engine() {
    let shared = Arc::new(SharedCatalog::new(InMemoryCatalog::fixture()));
    let engine = Arc::new(AuthorizationEngine::with_shared_catalog(shared.clone()));

    let mut handles = Vec::new();
    for i in 0..32 {
        let engine = engine.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let evaluation = engine.evaluation();
            let (subject, relation) = if i % 2 == 0 {
                ("USER-1", "member")
            } else {
                ("ADVERTISER-1", "owner")
            };
            let object = if i % 2 == 0 { "PIXEL-1" } else { "REPORT-1" };
            let request = CheckRequest::new("REPORT", object, relation, "USER", subject);

            let decisions: Vec<Decision> = (0..50)
                .map(|_| evaluation.check(&request).unwrap())
                .collect();
            decisions
        }));
    }

    // A concurrent refresh publishes an identical snapshot; answers must not change
    let refresher = {
        let shared = shared.clone();
        tokio::task::spawn_blocking(move || {
            for _ in 0..20 {
                shared.replace(InMemoryCatalog::fixture());
            }
        })
    };

    for handle in handles {
        let decisions = handle.await.unwrap();
        assert!(decisions.iter().all(|d| d.allowed));
        assert!(decisions.windows(2).all(|pair| pair[0] == pair[1]));
    }
    refresher.await.unwrap();
}
