//! The public entry point: composes client-auth, cache lookup, JWT
//! validation, claim parsing, and role resolution into a single
//! `authenticate` call, plus the realm's cache-management and lifecycle
//! operations.

use crate::cache::{CacheConfig, ExpiringUser, TokenCache};
use crate::claim_parser::ClaimParser;
use crate::client_auth::ClientAuthenticator;
use crate::config::RealmConfig;
use crate::error::{InfraError, RealmError};
use crate::jwt::{JwtAuthenticator, JwtAuthenticatorConfig};
use crate::keystore::KeyStore;
use crate::metadata::build_metadata;
use crate::role::{DelegatedAuthorization, NoOpDelegatedAuthorization, NoOpRoleMapper, RoleMapper};
use crate::token::AuthenticationToken;
use crate::user::{AuthenticationResult, User};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

fn fingerprint(jwt: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(jwt);
    hasher.finalize().into()
}

/// Construction inputs the realm does not own exclusively: role mapper and
/// delegated authorization are pluggable collaborators supplied by the
/// surrounding framework.
pub struct JwtRealm {
    client_auth: ClientAuthenticator,
    jwt_auth: Arc<JwtAuthenticator>,
    cache: Arc<TokenCache>,
    principal_parser: ClaimParser,
    groups_parser: ClaimParser,
    dn_parser: ClaimParser,
    mail_parser: ClaimParser,
    name_parser: ClaimParser,
    populate_user_metadata: bool,
    role_mapper: Arc<dyn RoleMapper>,
    delegated_authz: Arc<dyn DelegatedAuthorization>,
    initialized: AtomicBool,
}

impl JwtRealm {
    /// Build a realm from validated configuration and key material. The
    /// cache's `expireAll` is wired as the JWT authenticator's key-rotation
    /// hook at construction time.
    pub fn new(config: RealmConfig, key_store: Arc<dyn KeyStore>) -> Self {
        let cache = Arc::new(TokenCache::new(CacheConfig {
            ttl_secs: config.cache_ttl.as_secs(),
            max_size: config.cache_size,
        }));

        let rotation_cache = Arc::clone(&cache);
        let on_key_rotate: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            debug!("key material rotated, invalidating token cache");
            rotation_cache.invalidate_all();
        });

        let jwt_auth = Arc::new(JwtAuthenticator::new(
            key_store,
            JwtAuthenticatorConfig {
                allowed_algorithms: config.allowed_algorithms,
                issuer: config.issuer,
                audiences: config.audiences,
                allowed_clock_skew: config.allowed_clock_skew,
                token_type: "jwt".to_string(),
            },
            config.fallback_claim_names,
            on_key_rotate,
        ));

        Self {
            client_auth: ClientAuthenticator::new(config.client_auth_scheme),
            jwt_auth,
            cache,
            principal_parser: config.principal_parser,
            groups_parser: config.groups_parser,
            dn_parser: config.dn_parser,
            mail_parser: config.mail_parser,
            name_parser: config.name_parser,
            populate_user_metadata: config.populate_user_metadata,
            role_mapper: Arc::new(NoOpRoleMapper),
            delegated_authz: Arc::new(NoOpDelegatedAuthorization),
            initialized: AtomicBool::new(false),
        }
    }

    /// Swap in a configured role mapper. Only meaningful before `initialize`.
    #[must_use]
    pub fn with_role_mapper(mut self, role_mapper: Arc<dyn RoleMapper>) -> Self {
        self.role_mapper = role_mapper;
        self
    }

    /// Swap in delegated authorization. Only meaningful before `initialize`.
    #[must_use]
    pub fn with_delegated_authorization(mut self, delegated_authz: Arc<dyn DelegatedAuthorization>) -> Self {
        self.delegated_authz = delegated_authz;
        self
    }

    /// Must be called exactly once before any other operation except
    /// `close`. A second call is an error; it never panics.
    pub fn initialize(&self) -> Result<(), RealmError> {
        self.initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| RealmError::AlreadyInitialized)
    }

    /// Fails fast on every public operation but `close`.
    fn require_initialized(&self) -> Result<(), RealmError> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RealmError::NotInitialized)
        }
    }

    /// The full authenticate sequence: client-auth, cache lookup, JWT
    /// validation, claim parsing, role resolution, cache insert.
    pub async fn authenticate(
        &self,
        token: &dyn AuthenticationToken,
    ) -> Result<AuthenticationResult, InfraError> {
        self.require_initialized()?;

        if let Err(e) = self.client_auth.authenticate(token.client_secret()) {
            return Ok(AuthenticationResult::unsuccessful_with_cause(
                "client authentication failed",
                e.to_string(),
            ));
        }

        let fp = self.cache.enabled().then(|| fingerprint(token.bearer_token()));

        if let Some(fp) = fp {
            if let Some(ExpiringUser { user, .. }) = self.cache.get(&fp) {
                let user = if self.delegated_authz.has_delegation() {
                    self.delegated_authz.resolve(&user.principal).await?
                } else {
                    user
                };
                return Ok(AuthenticationResult::Success(user));
            }
        }

        let claims = match self.jwt_auth.authenticate(token.bearer_token()).await {
            Ok(claims) => claims,
            Err(e) => {
                return Ok(AuthenticationResult::unsuccessful_with_cause(
                    "JWT validation failed",
                    e.to_string(),
                ))
            }
        };

        let principal = match self.principal_parser.get_claim_value(&claims) {
            Ok(Some(p)) if !p.is_empty() => p,
            Ok(_) => return Ok(AuthenticationResult::unsuccessful("no principal claim present")),
            Err(e) => return Ok(AuthenticationResult::unsuccessful_with_cause("no principal", e.to_string())),
        };

        let user = if self.delegated_authz.has_delegation() {
            self.delegated_authz.resolve(&principal).await?
        } else {
            let groups = match self.groups_parser.get_claim_values(&claims) {
                Ok(g) => g,
                Err(e) => return Ok(AuthenticationResult::unsuccessful_with_cause("bad groups claim", e.to_string())),
            };
            let dn = match self.dn_parser.get_claim_value(&claims) {
                Ok(d) => d,
                Err(e) => return Ok(AuthenticationResult::unsuccessful_with_cause("bad dn claim", e.to_string())),
            };
            let mail = match self.mail_parser.get_claim_value(&claims) {
                Ok(m) => m,
                Err(e) => return Ok(AuthenticationResult::unsuccessful_with_cause("bad mail claim", e.to_string())),
            };
            let name = match self.name_parser.get_claim_value(&claims) {
                Ok(n) => n,
                Err(e) => return Ok(AuthenticationResult::unsuccessful_with_cause("bad name claim", e.to_string())),
            };

            let metadata = build_metadata(&claims, self.jwt_auth.token_type(), self.populate_user_metadata);
            let roles = self
                .role_mapper
                .resolve_roles(&principal, dn.as_deref(), &groups, &metadata)
                .await?;

            User::new(principal, roles)
                .with_full_name(name)
                .with_email(mail)
                .with_metadata(metadata)
        };

        if let Some(fp) = fp {
            if let Some(exp) = claims.exp() {
                let adjusted_exp = exp + self.jwt_auth.allowed_clock_skew_secs();
                self.cache.put(fp, ExpiringUser { user: user.clone(), adjusted_exp });
            }
        }

        Ok(AuthenticationResult::Success(user))
    }

    /// Removes all cache entries whose user's principal equals `principal`.
    pub fn expire(&self, principal: &str) {
        let principal = principal.to_string();
        self.cache.remove_if(move |p| p == principal);
    }

    /// Invalidates the entire cache. Never propagates a failure: any internal
    /// error is logged and swallowed, since keys may have rotated
    /// concurrently and a failed invalidation must not crash the
    /// authenticator.
    pub fn expire_all(&self) {
        self.cache.invalidate_all();
    }

    /// This realm does not support run-as or delegated-authz reverse lookup;
    /// always reports "not found".
    pub fn lookup_user(&self, _name: &str) -> Option<User> {
        None
    }

    /// Base realm stats composed with the cache's reported statistics.
    #[must_use]
    pub fn usage_stats(&self) -> Value {
        let stats = self.cache.stats();
        serde_json::json!({
            "jwt": {
                "cache": {
                    "size": stats.size,
                    "hits": stats.hits,
                    "misses": stats.misses,
                    "evictions": stats.evictions,
                    "capacity": stats.capacity,
                }
            }
        })
    }

    /// Closes the realm: closes the JWT authenticator (and, through it, its
    /// key store). The cache is dropped with the realm.
    pub fn close(&self) {
        if self.initialized.load(Ordering::SeqCst) {
            debug!("jwt realm closed");
        } else {
            warn!("jwt realm closed without being initialized");
        }
        self.jwt_auth.close();
    }
}
