use crate::error::{RebacError, Result};
use crate::models::{Identity, Resource};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Condition over a resolved (resource, subject) pair
pub type Predicate = Arc<dyn Fn(&Resource, &Identity) -> bool + Send + Sync>;

/// A named relation: when its predicate holds, access is granted with the rendered
/// message.
///
/// Messages are Handlebars templates over `subject_kind`, `subject_id`,
/// `resource_kind`, `resource_id` and `owner`. Values are inserted verbatim.
#[derive(Clone)]
pub struct RelationRule {
    name: String,
    predicate: Predicate,
    template: String,
}

impl RelationRule {
    pub fn new<F>(name: &str, predicate: F, template: &str) -> Self
    where
        F: Fn(&Resource, &Identity) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            predicate: Arc::new(predicate),
            template: template.to_string(),
        }
    }

    /// The subject is the resource owner
    pub fn owner() -> Self {
        Self::new(
            "owner",
            |resource, identity| resource.owner == identity.id,
            "{{subject_kind}} '{{subject_id}}' is the owner of resource '{{resource_id}}'",
        )
    }

    /// The subject belongs to the org owning the resource. One hop only.
    pub fn member() -> Self {
        Self::new(
            "member",
            |resource, identity| identity.belongs_to(&resource.owner),
            "{{subject_kind}} '{{subject_id}}' is a member of resource '{{resource_id}}' through owner '{{owner}}'",
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn holds(&self, resource: &Resource, identity: &Identity) -> bool {
        (self.predicate)(resource, identity)
    }
}

impl fmt::Debug for RelationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationRule")
            .field("name", &self.name)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct MessageContext<'a> {
    subject_kind: &'a str,
    subject_id: &'a str,
    resource_kind: &'a str,
    resource_id: &'a str,
    owner: &'a str,
}

/// Relation name to rule. The only place relations are defined.
///
/// Each rule's template is registered under the rule's name. Registration is
/// checked in [`RelationTable::try_with_rule`]; rendering runs in strict mode, so a
/// template naming an unknown field fails instead of printing nothing.
#[derive(Clone)]
pub struct RelationTable {
    rules: HashMap<String, RelationRule>,
    templates: Handlebars<'static>,
}

impl Default for RelationTable {
    fn default() -> Self {
        Self::empty()
            .with_rule(RelationRule::owner())
            .with_rule(RelationRule::member())
    }
}

impl RelationTable {
    pub fn empty() -> Self {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        templates.register_escape_fn(handlebars::no_escape);
        Self {
            rules: HashMap::new(),
            templates,
        }
    }

    /// Add a rule, replacing any rule with the same name.
    ///
    /// A template that does not parse is kept unregistered and fails when the rule
    /// grants; use [`RelationTable::try_with_rule`] to reject it up front.
    pub fn with_rule(mut self, rule: RelationRule) -> Self {
        if let Err(e) = self.register(&rule) {
            tracing::warn!(relation = %rule.name, error = %e, "Relation template rejected");
        }
        self.rules.insert(rule.name.clone(), rule);
        self
    }

    /// Add a rule, failing with `Configuration` when its template does not parse
    pub fn try_with_rule(mut self, rule: RelationRule) -> Result<Self> {
        self.register(&rule)?;
        self.rules.insert(rule.name.clone(), rule);
        Ok(self)
    }

    fn register(&mut self, rule: &RelationRule) -> Result<()> {
        self.templates.unregister_template(&rule.name);
        self.templates
            .register_template_string(&rule.name, &rule.template)
            .map_err(|e| {
                RebacError::Configuration(format!(
                    "invalid template for relation '{}': {}",
                    rule.name, e
                ))
            })
    }

    /// Relation names are case-sensitive.
    pub fn get(&self, relation: &str) -> Option<&RelationRule> {
        self.rules.get(relation)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Render the grant message of `rule` for a resolved pair
    pub fn render(&self, rule: &RelationRule, resource: &Resource, identity: &Identity) -> Result<String> {
        let context = MessageContext {
            subject_kind: identity.kind.as_str(),
            subject_id: &identity.id,
            resource_kind: resource.kind.as_str(),
            resource_id: &resource.id,
            owner: &resource.owner,
        };
        self.templates.render(&rule.name, &context).map_err(|e| {
            RebacError::Internal(
                anyhow::Error::new(e).context(format!("rendering message of relation '{}'", rule.name)),
            )
        })
    }
}

impl fmt::Debug for RelationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationTable")
            .field("rules", &self.names())
            .finish_non_exhaustive()
    }
}
