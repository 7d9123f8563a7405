//! Verifies a serialized JWT's signature against configured key material,
//! then its standard temporal and identity claims, and returns the parsed
//! claims set.

use crate::claims::ClaimsSet;
use crate::error::JwtError;
use crate::keystore::KeyStore;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Configuration fixed at construction: allowed algorithms, issuer, audiences,
/// and the clock-skew tolerance shared with the rest of the realm.
pub struct JwtAuthenticatorConfig {
    pub allowed_algorithms: Vec<Algorithm>,
    pub issuer: String,
    pub audiences: Vec<String>,
    pub allowed_clock_skew: Duration,
    /// A tag surfaced later in user metadata under `jwt_token_type`.
    pub token_type: String,
}

/// Validates serialized JWTs against a [`KeyStore`] and the realm's standard
/// claim requirements. Owns the key material indirectly (through the store)
/// and registers its cache-invalidation hook with it at construction; an
/// observer pattern where neither side owns the other.
pub struct JwtAuthenticator {
    key_store: Arc<dyn KeyStore>,
    config: JwtAuthenticatorConfig,
    /// Aliases a claim parser may try when the realm's explicit setting is
    /// unconfigured, e.g. `"sub"` falling back to `"subject"`.
    fallback_claim_names: HashMap<String, Vec<String>>,
}

impl JwtAuthenticator {
    /// Construct the authenticator and wire `on_key_rotate` as the key
    /// store's rotation hook (normally the realm's `expireAll`).
    pub fn new(
        key_store: Arc<dyn KeyStore>,
        config: JwtAuthenticatorConfig,
        fallback_claim_names: HashMap<String, Vec<String>>,
        on_key_rotate: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        key_store.set_rotation_hook(on_key_rotate);
        Self {
            key_store,
            config,
            fallback_claim_names,
        }
    }

    /// Read-only aliases claim parsers resolve standard-claim names through.
    #[must_use]
    pub fn fallback_claim_names(&self) -> &HashMap<String, Vec<String>> {
        &self.fallback_claim_names
    }

    /// The token-type tag surfaced in user metadata.
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.config.token_type
    }

    /// The configured clock-skew tolerance, in whole seconds.
    #[must_use]
    pub fn allowed_clock_skew_secs(&self) -> i64 {
        self.config.allowed_clock_skew.as_secs() as i64
    }

    /// Releases the HTTPS client used for JWKS fetches and cancels any
    /// pending refresh timers, by delegating to the key store.
    pub fn close(&self) {
        self.key_store.close();
    }

    /// Verify signature and standard claims, returning the parsed claims set.
    pub async fn authenticate(&self, token: &[u8]) -> Result<ClaimsSet, JwtError> {
        let token_str = std::str::from_utf8(token).map_err(|e| JwtError::Malformed(e.to_string()))?;

        let header = jsonwebtoken::decode_header(token_str).map_err(|e| JwtError::Malformed(e.to_string()))?;

        if !self.config.allowed_algorithms.contains(&header.alg) {
            return Err(JwtError::AlgorithmNotAllowed);
        }

        let key = self.key_store.decoding_key(header.alg, header.kid.as_deref()).await?;

        // Signature-only verification; claim timing/identity checks below are
        // hand-rolled to get exact control over the boundary semantics.
        let mut validation = jsonwebtoken::Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();
        validation.insecure_disable_signature_validation = false;

        let data: jsonwebtoken::TokenData<serde_json::Value> =
            jsonwebtoken::decode(token_str, &key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                other => JwtError::Malformed(other.to_string()),
            })?;

        let claims = ClaimsSet::from_value(data.claims)
            .ok_or_else(|| JwtError::Malformed("JWT payload is not a JSON object".to_string()))?;

        let now = now_unix();
        let skew = self.config.allowed_clock_skew.as_secs() as i64;

        if let Some(exp) = claims.exp() {
            if exp <= now - skew {
                return Err(JwtError::Expired);
            }
        }
        if let Some(nbf) = claims.nbf() {
            if nbf > now + skew {
                return Err(JwtError::NotYetValid);
            }
        }
        if !self.config.issuer.is_empty() {
            if claims.iss() != Some(self.config.issuer.as_str()) {
                return Err(JwtError::IssuerMismatch);
            }
        }
        if !self.config.audiences.is_empty() {
            let intersects = claims.aud().any(|a| self.config.audiences.iter().any(|cfg| cfg == a));
            if !intersects {
                return Err(JwtError::AudienceMismatch);
            }
        }

        Ok(claims)
    }
}
