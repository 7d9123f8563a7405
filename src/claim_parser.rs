//! A pure, immutable descriptor that pulls a single
//! string or a list of strings out of a [`ClaimsSet`], trying a configured
//! name first and then a realm-supplied list of fallback names.

use crate::claims::ClaimsSet;
use crate::error::{ClaimError, ConfigError};
use serde_json::Value;

/// Resolves one claim (principal, groups, dn, mail, or name) from a claims set.
#[derive(Debug, Clone)]
pub struct ClaimParser {
    setting: &'static str,
    /// The claim name actually used at lookup time (configured name, or the
    /// first-tried fallback — resolution order is fixed at construction).
    names: Vec<String>,
}

impl ClaimParser {
    /// Build a parser for a single setting.
    ///
    /// `configured` is the claim name explicitly set for this realm (e.g. via
    /// `claims.principal`); `fallback_names` are tried, in order, when it is
    /// absent. If neither yields a name and `required` is set, construction
    /// fails with [`ConfigError::MissingRequiredClaim`].
    pub fn new(
        setting: &'static str,
        configured: Option<&str>,
        fallback_names: &[String],
        required: bool,
    ) -> Result<Self, ConfigError> {
        let mut names = Vec::new();
        if let Some(name) = configured {
            names.push(name.to_string());
        } else {
            names.extend(fallback_names.iter().cloned());
        }
        if names.is_empty() && required {
            return Err(ConfigError::MissingRequiredClaim { setting });
        }
        Ok(Self { setting, names })
    }

    /// The setting name this parser was built for (`"claims.principal"`, etc.),
    /// used only for diagnostics.
    #[must_use]
    pub fn setting(&self) -> &'static str {
        self.setting
    }

    fn resolve<'a>(&self, claims: &'a ClaimsSet) -> Option<&'a Value> {
        self.names.iter().find_map(|name| claims.get(name))
    }

    /// A single string value, or `None` if the claim is absent. A one-element
    /// string list is unwrapped; a multi-element list is a shape error;
    /// numbers and booleans are never coerced and read as absent.
    pub fn get_claim_value(&self, claims: &ClaimsSet) -> Result<Option<String>, ClaimError> {
        let Some(value) = self.resolve(claims) else {
            return Ok(None);
        };
        match value {
            Value::String(s) => Ok(Some(s.clone())),
            Value::Array(items) => match items.as_slice() {
                [] => Ok(None),
                [Value::String(s)] => Ok(Some(s.clone())),
                [_] => Err(ClaimError::NonStringElement {
                    claim: self.setting.to_string(),
                }),
                _ => Err(ClaimError::WrongShape {
                    claim: self.setting.to_string(),
                }),
            },
            _ => Ok(None),
        }
    }

    /// The full list of string values. A scalar string is lifted to a
    /// one-element list; a non-string element in a list is a shape error; an
    /// absent claim returns the empty list.
    pub fn get_claim_values(&self, claims: &ClaimsSet) -> Result<Vec<String>, ClaimError> {
        let Some(value) = self.resolve(claims) else {
            return Ok(Vec::new());
        };
        match value {
            Value::String(s) => Ok(vec![s.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(ClaimError::NonStringElement {
                        claim: self.setting.to_string(),
                    }),
                })
                .collect(),
            _ => Ok(Vec::new()),
        }
    }
}
