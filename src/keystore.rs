//! Key material for JWT signature verification.
//!
//! The key-material loader (JWKS refresh, HTTPS client) is treated as an
//! external collaborator; this module defines the narrow trait the
//! [`crate::jwt::JwtAuthenticator`] consumes and ships two concrete
//! implementations of it: static HMAC secrets, and a JWKS-backed store
//! grounded on `brrtrouter::security::JwksBearerProvider`'s fetch/cache/retry
//! logic (adapted from its blocking `reqwest` client to an async one, since
//! realm authentication is itself async here).

use crate::error::JwtError;
use async_trait::async_trait;
use base64::Engine as _;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A source of JWT decoding keys, addressable by an optional `kid`.
///
/// Implementations that can observe key rotation (JWKS refresh replacing a
/// key, symmetric-key reconfiguration) must invoke the hook registered via
/// [`KeyStore::set_rotation_hook`] exactly once per change event. The realm
/// wires this hook to its cache's `expireAll` so neither side holds a
/// reference to the other.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Resolve a decoding key for the given algorithm and key id.
    async fn decoding_key(&self, alg: Algorithm, kid: Option<&str>) -> Result<DecodingKey, JwtError>;

    /// Register the realm's key-rotation callback. Default is a no-op for
    /// key stores that never rotate (e.g. [`StaticKeySet`]).
    fn set_rotation_hook(&self, hook: Arc<dyn Fn() + Send + Sync>) {
        let _ = hook;
    }

    /// Release any HTTPS client or refresh timer this store owns. Default is
    /// a no-op for stores with no background resources (e.g. [`StaticKeySet`],
    /// and [`JwksKeyStore`] in this crate, which refreshes lazily on lookup
    /// rather than on a timer).
    fn close(&self) {}
}

/// Symmetric HMAC keys configured directly, with no external fetch and no
/// rotation. The common case for internal services sharing a pre-shared
/// secret.
pub struct StaticKeySet {
    keys: HashMap<Option<String>, DecodingKey>,
}

impl StaticKeySet {
    /// A single unnamed key, used for tokens without a `kid` header.
    #[must_use]
    pub fn single_secret(secret: &[u8]) -> Self {
        let mut keys = HashMap::new();
        keys.insert(None, DecodingKey::from_secret(secret));
        Self { keys }
    }

    /// Multiple named keys, addressed by `kid`.
    #[must_use]
    pub fn named_secrets(secrets: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        let keys = secrets
            .into_iter()
            .map(|(kid, secret)| (Some(kid), DecodingKey::from_secret(&secret)))
            .collect();
        Self { keys }
    }
}

#[async_trait]
impl KeyStore for StaticKeySet {
    async fn decoding_key(&self, _alg: Algorithm, kid: Option<&str>) -> Result<DecodingKey, JwtError> {
        let key = kid
            .and_then(|k| self.keys.get(&Some(k.to_string())))
            .or_else(|| self.keys.get(&None));
        key.cloned()
            .ok_or_else(|| JwtError::KeyUnavailable(kid.unwrap_or("<none>").to_string()))
    }
}

struct JwksCache {
    fetched_at: Instant,
    keys: HashMap<String, DecodingKey>,
}

/// JWKS-backed key store for production integrations: fetches keys from a
/// JWKS endpoint and caches them with a TTL, re-fetching on expiry.
///
/// Ported from `brrtrouter::security::JwksBearerProvider::refresh_jwks_if_needed`:
/// same HMAC(`oct`)/RSA key parsing, same retry count, reworked onto an async
/// `reqwest::Client` and a rotation hook instead of a hand-inlined cache.
pub struct JwksKeyStore {
    jwks_url: String,
    client: reqwest::Client,
    cache_ttl: Duration,
    cache: Mutex<Option<JwksCache>>,
    rotation_hook: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl JwksKeyStore {
    /// Create a store fetching from `jwks_url`. HTTPS is required except for
    /// `localhost`/`127.0.0.1`.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, JwtError> {
        let url_str = jwks_url.into();
        let parsed =
            url::Url::parse(&url_str).map_err(|e| JwtError::KeyUnavailable(format!("invalid JWKS URL: {e}")))?;
        match parsed.scheme() {
            "https" => {}
            "http" => {
                let host = parsed.host_str().unwrap_or("");
                if host != "localhost" && host != "127.0.0.1" {
                    return Err(JwtError::KeyUnavailable(
                        "JWKS URL must use HTTPS (HTTP only allowed for localhost/127.0.0.1)".to_string(),
                    ));
                }
            }
            other => {
                return Err(JwtError::KeyUnavailable(format!(
                    "unsupported JWKS URL scheme '{other}'"
                )))
            }
        }
        Ok(Self {
            jwks_url: url_str,
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(500))
                .build()
                .map_err(|e| JwtError::KeyUnavailable(e.to_string()))?,
            cache_ttl: Duration::from_secs(300),
            cache: Mutex::new(None),
            rotation_hook: Mutex::new(None),
        })
    }

    /// Override the JWKS cache TTL (default 300s).
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    async fn refresh_if_needed(&self) -> Result<(), JwtError> {
        let stale = {
            let guard = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            match &*guard {
                Some(c) => c.fetched_at.elapsed() >= self.cache_ttl,
                None => true,
            }
        };
        if !stale {
            return Ok(());
        }

        let mut body = None;
        for attempt in 0..3 {
            match self.client.get(&self.jwks_url).send().await {
                Ok(resp) => match resp.text().await {
                    Ok(text) => {
                        body = Some(text);
                        break;
                    }
                    Err(e) => debug!(attempt, error = %e, "JWKS fetch: failed to read body"),
                },
                Err(e) => debug!(attempt, error = %e, "JWKS fetch: request failed"),
            }
        }
        let Some(body) = body else {
            warn!(url = %self.jwks_url, "JWKS fetch exhausted retries, keeping stale cache");
            return Ok(());
        };

        let parsed: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| JwtError::KeyUnavailable(format!("invalid JWKS JSON: {e}")))?;

        let mut new_map: HashMap<String, DecodingKey> = HashMap::new();
        if let Some(keys) = parsed.get("keys").and_then(|v| v.as_array()) {
            for key in keys {
                let kid = key.get("kid").and_then(|v| v.as_str()).unwrap_or("");
                let kty = key.get("kty").and_then(|v| v.as_str()).unwrap_or("");
                let alg = key.get("alg").and_then(|v| v.as_str()).unwrap_or("");
                if kty.eq_ignore_ascii_case("oct")
                    && matches!(alg.to_ascii_uppercase().as_str(), "HS256" | "HS384" | "HS512")
                {
                    if let Some(kval) = key.get("k").and_then(|v| v.as_str()) {
                        if let Ok(secret) =
                            base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(kval)
                        {
                            new_map.insert(kid.to_string(), DecodingKey::from_secret(&secret));
                        }
                    }
                    continue;
                }
                if kty.eq_ignore_ascii_case("RSA")
                    && matches!(alg.to_ascii_uppercase().as_str(), "RS256" | "RS384" | "RS512")
                {
                    let (Some(n), Some(e)) = (
                        key.get("n").and_then(|v| v.as_str()),
                        key.get("e").and_then(|v| v.as_str()),
                    ) else {
                        continue;
                    };
                    if let Ok(dk) = DecodingKey::from_rsa_components(n, e) {
                        new_map.insert(kid.to_string(), dk);
                    }
                }
            }
        }

        let previous_kids: Option<HashSet<&String>> = {
            let guard = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            guard.as_ref().map(|c| c.keys.keys().collect())
        };
        let changed = match previous_kids {
            None => false, // first fetch is not a "rotation"
            Some(prev) => {
                let new_kids: HashSet<&String> = new_map.keys().collect();
                prev != new_kids
            }
        };

        {
            let mut guard = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            *guard = Some(JwksCache {
                fetched_at: Instant::now(),
                keys: new_map,
            });
        }

        if changed {
            debug!(url = %self.jwks_url, "JWKS key set changed, invoking rotation hook");
            if let Some(hook) = self.rotation_hook.lock().unwrap_or_else(|p| p.into_inner()).as_ref() {
                hook();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl KeyStore for JwksKeyStore {
    async fn decoding_key(&self, _alg: Algorithm, kid: Option<&str>) -> Result<DecodingKey, JwtError> {
        self.refresh_if_needed().await?;
        let guard = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        let cache = guard
            .as_ref()
            .ok_or_else(|| JwtError::KeyUnavailable("JWKS cache empty".to_string()))?;
        let kid = kid.ok_or_else(|| JwtError::KeyUnavailable("token has no 'kid' header".to_string()))?;
        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| JwtError::KeyUnavailable(format!("no JWKS key for kid '{kid}'")))
    }

    fn set_rotation_hook(&self, hook: Arc<dyn Fn() + Send + Sync>) {
        *self.rotation_hook.lock().unwrap_or_else(|p| p.into_inner()) = Some(hook);
    }
}
