use crate::{
    catalog::{Catalog, LookupContext},
    error::{RebacError, Result},
    models::*,
};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Resolve a free-form identifier (alias or canonical ID) to an identity.
///
/// An unknown identifier is a negative [`Resolution`], not an error. Only an empty
/// identifier or a failing catalog produce `Err`.
pub fn resolve_identity(catalog: &dyn Catalog, ctx: &LookupContext, id: &str) -> Result<Resolution> {
    if id.is_empty() {
        return Err(RebacError::invalid_argument("id"));
    }

    Ok(match lookup_identity(catalog, ctx, id)? {
        Some(identity) => found(identity.kind.as_str(), identity.id, id),
        None => not_found(id),
    })
}

/// Resolve a free-form identifier (alias or canonical ID) to a resource.
pub fn resolve_resource(catalog: &dyn Catalog, ctx: &LookupContext, id: &str) -> Result<Resolution> {
    if id.is_empty() {
        return Err(RebacError::invalid_argument("id"));
    }

    Ok(match lookup_resource(catalog, ctx, id)? {
        Some(resource) => found(resource.kind.as_str(), resource.id, id),
        None => not_found(id),
    })
}

pub(crate) fn lookup_identity(
    catalog: &dyn Catalog,
    ctx: &LookupContext,
    key: &str,
) -> Result<Option<Identity>> {
    ctx.ensure_active(key)?;
    let identity = catalog.get_identity(key, ctx)?;
    debug!(key = key, found = identity.is_some(), "Identity lookup");
    Ok(identity)
}

pub(crate) fn lookup_resource(
    catalog: &dyn Catalog,
    ctx: &LookupContext,
    key: &str,
) -> Result<Option<Resource>> {
    ctx.ensure_active(key)?;
    let resource = catalog.get_resource(key, ctx)?;
    debug!(key = key, found = resource.is_some(), "Resource lookup");
    Ok(resource)
}

fn found(kind: &str, canonical_id: String, input: &str) -> Resolution {
    Resolution {
        canonical_id,
        message: format!("{} found with id '{}'", title_case(kind), input),
    }
}

fn not_found(input: &str) -> Resolution {
    Resolution {
        canonical_id: String::new(),
        message: format!("Object not found with id '{}'", input),
    }
}

/// Upper-case the first letter of every word and lower-case the rest.
///
/// Words follow Unicode word boundaries: underscores and dots between letters stay
/// inside a word (`HOLDING_COMPANY` becomes `Holding_company`) while spaces, hyphens
/// and slashes separate words (`AD-NETWORK` becomes `Ad-Network`).
pub fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for word in value.split_word_bounds() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.extend(chars.flat_map(char::to_lowercase));
        }
    }
    result
}
