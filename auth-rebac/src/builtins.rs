//! Host-facing builtin functions.
//!
//! A policy host registers each builtin under its name, passes one structured
//! argument per call and receives a two-element array back. Argument decoding is
//! lenient about missing keys (they become empty strings and fail validation with
//! `InvalidArgument`), strict about shape (a non-object argument is a decode error).

use crate::{
    engine::{AuthorizationEngine, Evaluation},
    error::{RebacError, Result},
    models::CheckRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const IDENTITY_BUILTIN: &str = "va.v1.identity";
pub const RESOURCE_BUILTIN: &str = "va.v1.resource";
pub const CHECK_BUILTIN: &str = "va.v1.check";

/// Value types in builtin declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Any,
    String,
    Boolean,
}

/// Signature a host needs to register a builtin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltinDecl {
    pub name: &'static str,
    pub args: Vec<ValueType>,
    pub result: Vec<ValueType>,
    /// Results may be cached for identical arguments within one evaluation
    pub memoize: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Identity,
    Resource,
    Check,
}

impl Builtin {
    pub const ALL: [Builtin; 3] = [Builtin::Identity, Builtin::Resource, Builtin::Check];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Identity => IDENTITY_BUILTIN,
            Builtin::Resource => RESOURCE_BUILTIN,
            Builtin::Check => CHECK_BUILTIN,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn decl(&self, memoize: bool) -> BuiltinDecl {
        let result = match self {
            Builtin::Identity | Builtin::Resource => vec![ValueType::String, ValueType::String],
            Builtin::Check => vec![ValueType::Boolean, ValueType::String],
        };
        BuiltinDecl {
            name: self.name(),
            args: vec![ValueType::Any],
            result,
            memoize,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct IdArgs {
    #[serde(default)]
    id: String,
}

/// Declarations and dispatch for the builtins backed by one engine
#[derive(Debug, Clone, Copy)]
pub struct BuiltinRegistry {
    memoize: bool,
}

impl BuiltinRegistry {
    pub fn for_engine(engine: &AuthorizationEngine) -> Self {
        Self {
            memoize: engine.config().memoize,
        }
    }

    pub fn declarations(&self) -> Vec<BuiltinDecl> {
        Builtin::ALL
            .iter()
            .map(|builtin| builtin.decl(self.memoize))
            .collect()
    }

    pub fn declaration(&self, name: &str) -> Option<BuiltinDecl> {
        Builtin::from_name(name).map(|builtin| builtin.decl(self.memoize))
    }

    /// Invoke a builtin by name within `evaluation`.
    pub fn invoke(&self, evaluation: &Evaluation<'_>, name: &str, args: &Value) -> Result<Value> {
        let builtin = Builtin::from_name(name)
            .ok_or_else(|| RebacError::Decode(format!("unknown builtin '{}'", name)))?;

        match builtin {
            Builtin::Identity => {
                let args: IdArgs = decode(args)?;
                let (id, message) = evaluation.resolve_identity(&args.id)?.into_parts();
                Ok(json!([id, message]))
            }
            Builtin::Resource => {
                let args: IdArgs = decode(args)?;
                let (id, message) = evaluation.resolve_resource(&args.id)?.into_parts();
                Ok(json!([id, message]))
            }
            Builtin::Check => {
                let request: CheckRequest = decode(args)?;
                let (allowed, message) = evaluation.check(&request)?.into_parts();
                Ok(json!([allowed, message]))
            }
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(args: &Value) -> Result<T> {
    if !args.is_object() {
        return Err(RebacError::Decode(format!(
            "expected an object argument, got {}",
            value_kind(args)
        )));
    }
    Ok(T::deserialize(args)?)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
