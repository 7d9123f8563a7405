//! Filters a claims mapping into a user-metadata mapping with a fixed key
//! prefix and a closed type allow-list.

use crate::claims::ClaimsSet;
use serde_json::{Map, Value};

/// A `jwt_claim_*`-prefixed, type-filtered view of a claims set, plus the
/// fixed `jwt_token_type` entry. Immutable once built.
pub type Metadata = Map<String, Value>;

/// Does this value pass the metadata type filter: string, boolean, number, or
/// a sequence whose every element is string/boolean/number?
fn is_metadata_eligible(value: &Value) -> bool {
    match value {
        Value::String(_) | Value::Bool(_) | Value::Number(_) => true,
        Value::Array(items) => items.iter().all(|item| {
            matches!(item, Value::String(_) | Value::Bool(_) | Value::Number(_))
        }),
        Value::Object(_) | Value::Null => false,
    }
}

/// Build the metadata mapping for a successful authentication.
///
/// Always includes `{"jwt_token_type": token_type}`. When `populate` is set,
/// every claim whose value passes [`is_metadata_eligible`] is added under
/// `jwt_claim_<name>`; nested maps, nulls, and heterogeneous nested
/// collections are dropped silently.
#[must_use]
pub fn build_metadata(claims: &ClaimsSet, token_type: &str, populate: bool) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("jwt_token_type".to_string(), Value::String(token_type.to_string()));

    if populate {
        for (name, value) in claims.as_object() {
            if is_metadata_eligible(value) {
                metadata.insert(format!("jwt_claim_{name}"), value.clone());
            }
        }
    }
    metadata
}
