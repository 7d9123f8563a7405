//! The validated JWT payload as a name -> value mapping.
//!
//! Grounded on `brrtrouter::security::JwksBearerProvider`, which decodes JWTs as
//! `serde_json::Value` throughout (`jsonwebtoken::decode::<serde_json::Value>`)
//! rather than a fixed struct, since claim shapes vary by issuer.

use serde_json::Value;

/// A decoded JWT payload. Values may be string, boolean, number, or a
/// homogeneous sequence of those scalars; nested mappings and nulls are
/// rejected by the metadata builder but are otherwise passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimsSet(Value);

impl ClaimsSet {
    /// Wrap an already-decoded JWT payload. Returns `None` if the value is not
    /// a JSON object (a JWT payload is always an object per RFC 7519).
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        value.is_object().then_some(Self(value))
    }

    /// Raw lookup of any claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The registered `exp` claim as Unix seconds, if present and numeric.
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.get("exp").and_then(Value::as_i64)
    }

    /// The registered `nbf` claim as Unix seconds, if present and numeric.
    #[must_use]
    pub fn nbf(&self) -> Option<i64> {
        self.get("nbf").and_then(Value::as_i64)
    }

    /// The registered `iat` claim as Unix seconds, if present and numeric.
    #[must_use]
    pub fn iat(&self) -> Option<i64> {
        self.get("iat").and_then(Value::as_i64)
    }

    /// The registered `iss` claim, if present and a string.
    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.get("iss").and_then(Value::as_str)
    }

    /// The registered `aud` claim(s): either a single string or an array of
    /// strings, normalized to an iterator of `&str`.
    pub fn aud(&self) -> impl Iterator<Item = &str> {
        let value = self.get("aud");
        let single = value.and_then(Value::as_str);
        let many = value.and_then(Value::as_array);
        single
            .into_iter()
            .chain(many.into_iter().flatten().filter_map(Value::as_str))
    }

    /// Access the underlying JSON object for metadata building.
    #[must_use]
    pub fn as_object(&self) -> &serde_json::Map<String, Value> {
        // Construction guarantees `self.0` is an object.
        match &self.0 {
            Value::Object(map) => map,
            _ => unreachable!("ClaimsSet always wraps a JSON object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object_payloads() {
        assert!(ClaimsSet::from_value(json!([1, 2, 3])).is_none());
        assert!(ClaimsSet::from_value(json!("not an object")).is_none());
    }

    #[test]
    fn reads_registered_claims() {
        let claims = ClaimsSet::from_value(json!({
            "exp": 1_700_000_000i64,
            "nbf": 1_699_999_000i64,
            "iat": 1_699_999_500i64,
            "iss": "https://issuer.example",
            "aud": ["api-a", "api-b"],
        }))
        .expect("object payload");

        assert_eq!(claims.exp(), Some(1_700_000_000));
        assert_eq!(claims.nbf(), Some(1_699_999_000));
        assert_eq!(claims.iat(), Some(1_699_999_500));
        assert_eq!(claims.iss(), Some("https://issuer.example"));
        assert_eq!(claims.aud().collect::<Vec<_>>(), vec!["api-a", "api-b"]);
    }

    #[test]
    fn single_string_audience() {
        let claims = ClaimsSet::from_value(json!({"aud": "solo"})).expect("object payload");
        assert_eq!(claims.aud().collect::<Vec<_>>(), vec!["solo"]);
    }
}
