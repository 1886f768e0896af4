use crate::{
    catalog::{Catalog, LookupContext},
    error::Result,
    models::*,
    relations::RelationTable,
    resolver::{lookup_identity, lookup_resource},
};
use std::sync::Arc;
use tracing::debug;

/// Decides whether a named relation holds between a subject and an object.
///
/// Every call is a single pass with four possible endings:
/// - the object does not resolve: deny
/// - the subject does not resolve: deny
/// - the relation's rule holds: grant with the rule's message
/// - anything else: default deny
///
/// Unresolvable objects and subjects are denials, not errors. Errors are reserved for
/// malformed requests and catalog failures.
#[derive(Debug, Clone)]
pub struct RelationshipChecker {
    relations: Arc<RelationTable>,
}

impl Default for RelationshipChecker {
    fn default() -> Self {
        Self::new(Arc::new(RelationTable::default()))
    }
}

impl RelationshipChecker {
    pub fn new(relations: Arc<RelationTable>) -> Self {
        Self { relations }
    }

    pub fn relations(&self) -> &RelationTable {
        &self.relations
    }

    pub fn check(
        &self,
        catalog: &dyn Catalog,
        ctx: &LookupContext,
        request: &CheckRequest,
    ) -> Result<Decision> {
        request.validate()?;

        let Some(resource) = lookup_resource(catalog, ctx, &request.object_id)? else {
            return Ok(Decision::deny(
                Outcome::ObjectNotFound,
                format!("{} not found with id '{}'", request.object_type, request.object_id),
            ));
        };

        let Some(identity) = lookup_identity(catalog, ctx, &request.subject_id)? else {
            return Ok(Decision::deny(
                Outcome::SubjectNotFound,
                format!("{} not found with id '{}'", request.subject_type, request.subject_id),
            ));
        };

        match self.relations.get(&request.relation) {
            Some(rule) if rule.holds(&resource, &identity) => {
                debug!(relation = %request.relation, subject = %identity, object = %resource, "Relation holds");
                let message = self.relations.render(rule, &resource, &identity)?;
                return Ok(Decision::grant(message));
            }
            Some(_) => {
                debug!(relation = %request.relation, subject = %identity, object = %resource, "Relation does not hold");
            }
            None => {
                debug!(relation = %request.relation, "Unknown relation");
            }
        }

        Ok(Decision::deny(
            Outcome::DefaultDeny,
            format!("default no access, check logs? ({})", request),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, MockCatalog};
    use crate::error::{CatalogError, RebacError};

    fn check(request: CheckRequest) -> Result<Decision> {
        RelationshipChecker::default().check(
            &InMemoryCatalog::fixture(),
            &LookupContext::unbounded(),
            &request,
        )
    }

    #[test]
    fn test_owner_grant() {
        let decision = check(CheckRequest::new("AUDIENCE", "AUD-1", "owner", "USER", "USER-1")).unwrap();

        assert!(decision.allowed);
        assert_eq!(decision.outcome, Outcome::RelationGranted);
        assert_eq!(decision.message, "USER 'UUID-1' is the owner of resource 'UUID-1'");
    }

    #[test]
    fn test_member_grant() {
        let decision = check(CheckRequest::new("PIXEL", "PIXEL-1", "member", "USER", "USER-1")).unwrap();

        assert!(decision.allowed);
        assert_eq!(
            decision.message,
            "USER 'UUID-1' is a member of resource 'UUID-2' through owner 'UUID-2'"
        );
    }

    #[test]
    fn test_owner_condition_false_falls_through() {
        let decision = check(CheckRequest::new("PIXEL", "PIXEL-1", "owner", "USER", "USER-1")).unwrap();

        assert!(!decision.allowed);
        assert_eq!(decision.outcome, Outcome::DefaultDeny);
        assert_eq!(
            decision.message,
            "default no access, check logs? ({PIXEL PIXEL-1 owner USER USER-1})"
        );
    }

    #[test]
    fn test_unknown_relation_falls_through() {
        let decision = check(CheckRequest::new("AUDIENCE", "AUD-1", "editor", "USER", "USER-1")).unwrap();

        assert!(!decision.allowed);
        assert_eq!(decision.outcome, Outcome::DefaultDeny);
    }

    #[test]
    fn test_object_not_found() {
        let decision = check(CheckRequest::new("AUDIENCE", "AUD-9", "owner", "USER", "USER-404")).unwrap();

        assert!(!decision.allowed);
        assert_eq!(decision.outcome, Outcome::ObjectNotFound);
        assert_eq!(decision.message, "AUDIENCE not found with id 'AUD-9'");
    }

    #[test]
    fn test_subject_not_found() {
        let decision = check(CheckRequest::new("AUDIENCE", "AUD-1", "owner", "USER", "USER-404")).unwrap();

        assert!(!decision.allowed);
        assert_eq!(decision.outcome, Outcome::SubjectNotFound);
        assert_eq!(decision.message, "USER not found with id 'USER-404'");
    }

    #[test]
    fn test_missing_field_fails_before_lookup() {
        let mut catalog = MockCatalog::new();
        catalog.expect_get_resource().never();
        catalog.expect_get_identity().never();

        let request = CheckRequest::new("AUDIENCE", "AUD-1", "", "USER", "USER-1");
        let err = RelationshipChecker::default()
            .check(&catalog, &LookupContext::unbounded(), &request)
            .unwrap_err();
        assert!(matches!(err, RebacError::InvalidArgument { field: "relation" }));
    }

    #[test]
    fn test_missing_object_skips_subject_lookup() {
        let mut catalog = MockCatalog::new();
        catalog.expect_get_resource().times(1).returning(|_, _| Ok(None));
        catalog.expect_get_identity().never();

        let request = CheckRequest::new("REPORT", "REPORT-2", "owner", "USER", "USER-1");
        let decision = RelationshipChecker::default()
            .check(&catalog, &LookupContext::unbounded(), &request)
            .unwrap();
        assert_eq!(decision.outcome, Outcome::ObjectNotFound);
    }

    #[test]
    fn test_broken_grant_message_is_an_internal_error() {
        let relations = RelationTable::default().with_rule(crate::relations::RelationRule::new(
            "owner",
            |resource, identity| resource.owner == identity.id,
            "{{subject_id}} owns {{object_name}}",
        ));
        let checker = RelationshipChecker::new(Arc::new(relations));

        let request = CheckRequest::new("AUDIENCE", "AUD-1", "owner", "USER", "USER-1");
        let err = checker
            .check(&InMemoryCatalog::fixture(), &LookupContext::unbounded(), &request)
            .unwrap_err();
        assert!(matches!(err, RebacError::Internal(_)));
        assert!(err.to_string().contains("relation 'owner'"));
    }

    #[test]
    fn test_subject_lookup_failure_is_an_error() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_get_resource()
            .returning(|_, _| Ok(Some(Resource::new("UUID-1", "AUDIENCE", "UUID-1"))));
        catalog
            .expect_get_identity()
            .returning(|key, _| Err(CatalogError::Timeout { key: key.to_string() }));

        let request = CheckRequest::new("AUDIENCE", "UUID-1", "owner", "USER", "UUID-1");
        let result = RelationshipChecker::default().check(&catalog, &LookupContext::unbounded(), &request);
        assert!(matches!(
            result,
            Err(RebacError::Catalog(CatalogError::Timeout { .. }))
        ));
    }
}
