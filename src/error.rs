//! Error types for every fallible boundary in the realm.
//!
//! Mirrors the propagation rule from the design: validation failures become
//! `unsuccessful` results, infrastructure failures become listener/caller
//! failures, and configuration failures fail construction outright.

use thiserror::Error;

/// Construction-time failures: bad claim-parser configuration, incompatible
/// client-auth settings, invalid cache settings. Fatal to realm construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("claim parser '{setting}' has no configured name and no fallback names, but is required")]
    MissingRequiredClaim { setting: &'static str },

    #[error("client_authentication.type is 'shared_secret' but no shared_secret was configured")]
    MissingSharedSecret,

    #[error("client_authentication.shared_secret was set but type is 'none'")]
    UnexpectedSharedSecret,

    #[error("client_authentication.type '{0}' is invalid, expected 'none' or 'shared_secret'")]
    InvalidClientAuthType(String),

    #[error("jwt.cache.ttl and jwt.cache.size must both be zero or both be positive, got ttl={ttl_secs}s size={size}")]
    InconsistentCacheSettings { ttl_secs: u64, size: usize },

    #[error("invalid duration '{raw}': {reason}")]
    InvalidDuration { raw: String, reason: String },

    #[error("invalid realm settings TOML: {0}")]
    InvalidToml(String),
}

/// Failures from validating a JWT against the configured key material and claims.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token uses algorithm not in the configured allow-list")]
    AlgorithmNotAllowed,

    #[error("token signature did not verify")]
    InvalidSignature,

    #[error("token issuer does not match configured issuer")]
    IssuerMismatch,

    #[error("token audience does not intersect configured audiences")]
    AudienceMismatch,

    #[error("token is expired")]
    Expired,

    #[error("token is not yet valid (nbf in the future)")]
    NotYetValid,

    #[error("token could not be parsed: {0}")]
    Malformed(String),

    #[error("no decoding key available for this token: {0}")]
    KeyUnavailable(String),
}

/// Claim-parser failures: a claim was present but not string-shaped as required.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("claim '{claim}' is a multi-element list; expected a single string value")]
    WrongShape { claim: String },

    #[error("claim '{claim}' contains a non-string element")]
    NonStringElement { claim: String },
}

/// Client (sidecar) credential failures. Never carries the configured secret.
#[derive(Debug, Error)]
pub enum ClientAuthError {
    #[error("client authentication secret was presented but none is expected")]
    UnexpectedSecret,

    #[error("client authentication secret is required but was not presented")]
    MissingSecret,

    #[error("client authentication secret did not match")]
    SecretMismatch,
}

/// Realm lifecycle invariant violations.
#[derive(Debug, Error)]
pub enum RealmError {
    #[error("realm.initialize() was already called once")]
    AlreadyInitialized,

    #[error("realm operation invoked before initialize() completed")]
    NotInitialized,
}

/// Infrastructure failures surfaced through the caller's failure channel rather
/// than as an `unsuccessful` authentication result: key-fetch errors, delegated
/// authorization transport errors, role-mapper errors.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("key material unavailable: {0}")]
    KeyStore(String),

    #[error("role resolution failed: {0}")]
    RoleResolution(String),

    #[error("delegated authorization failed: {0}")]
    DelegatedAuthorization(String),

    #[error(transparent)]
    Realm(#[from] RealmError),
}
