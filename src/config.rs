//! Realm configuration: parses the settings a realm instance is scoped to
//! into the immutable, validated structures the other modules consume.

use crate::claim_parser::ClaimParser;
use crate::client_auth::ClientAuthScheme;
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Raw, serde-deserializable settings as they'd arrive from a TOML realm
/// section. Durations are strings like `"5m"`, `"30s"`, `"1h"`.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtRealmSettings {
    #[serde(default = "default_clock_skew")]
    pub allowed_clock_skew: String,
    #[serde(default)]
    pub populate_user_metadata: bool,
    #[serde(default)]
    pub client_authentication: ClientAuthSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub claims: ClaimSettings,
    #[serde(default)]
    pub allowed_algorithms: Vec<String>,
    pub issuer: String,
    #[serde(default)]
    pub audiences: Vec<String>,
}

fn default_clock_skew() -> String {
    "60s".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientAuthSettings {
    #[serde(default = "default_client_auth_type")]
    pub r#type: String,
    pub shared_secret: Option<String>,
}

fn default_client_auth_type() -> String {
    "none".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub ttl: Option<String>,
    #[serde(default)]
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimSettings {
    pub principal: Option<String>,
    pub groups: Option<String>,
    pub dn: Option<String>,
    pub mail: Option<String>,
    pub name: Option<String>,
}

/// Parse a duration string of the shape `<integer><unit>` where unit is one
/// of `s`, `m`, `h`. No external duration-parsing crate is pulled in for this
/// narrow a grammar.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let err = |reason: &str| ConfigError::InvalidDuration {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(err("empty duration string"));
    }
    let (digits, unit) = raw.split_at(raw.len() - 1);
    let amount: u64 = digits.parse().map_err(|_| err("not of the form <integer><unit>"))?;
    let secs = match unit {
        "s" => amount,
        "m" => amount.checked_mul(60).ok_or_else(|| err("overflow"))?,
        "h" => amount.checked_mul(3600).ok_or_else(|| err("overflow"))?,
        other => return Err(err(&format!("unknown unit '{other}', expected s/m/h"))),
    };
    Ok(Duration::from_secs(secs))
}

/// Fully validated configuration ready to build a [`crate::realm::JwtRealm`].
pub struct RealmConfig {
    pub allowed_clock_skew: Duration,
    pub populate_user_metadata: bool,
    pub client_auth_scheme: ClientAuthScheme,
    pub cache_ttl: Duration,
    pub cache_size: usize,
    pub issuer: String,
    pub audiences: Vec<String>,
    pub allowed_algorithms: Vec<jsonwebtoken::Algorithm>,
    pub principal_parser: ClaimParser,
    pub groups_parser: ClaimParser,
    pub dn_parser: ClaimParser,
    pub mail_parser: ClaimParser,
    pub name_parser: ClaimParser,
    pub fallback_claim_names: HashMap<String, Vec<String>>,
}

impl RealmConfig {
    /// Parse and validate a realm's settings from a TOML document, e.g. the
    /// `[realms.jwt.<name>]` section of a settings file.
    pub fn from_toml(
        text: &str,
        fallback_claim_names: HashMap<String, Vec<String>>,
    ) -> Result<Self, ConfigError> {
        let settings: JwtRealmSettings = toml::from_str(text).map_err(|e| ConfigError::InvalidToml(e.to_string()))?;
        Self::from_settings(&settings, fallback_claim_names)
    }

    pub fn from_settings(
        settings: &JwtRealmSettings,
        fallback_claim_names: HashMap<String, Vec<String>>,
    ) -> Result<Self, ConfigError> {
        let client_auth_scheme = match settings.client_authentication.r#type.as_str() {
            "none" => {
                if settings.client_authentication.shared_secret.is_some() {
                    return Err(ConfigError::UnexpectedSharedSecret);
                }
                ClientAuthScheme::None
            }
            "shared_secret" => {
                let secret = settings
                    .client_authentication
                    .shared_secret
                    .as_ref()
                    .ok_or(ConfigError::MissingSharedSecret)?;
                ClientAuthScheme::SharedSecret(secret.as_bytes().to_vec())
            }
            other => return Err(ConfigError::InvalidClientAuthType(other.to_string())),
        };

        let cache_ttl = match &settings.cache.ttl {
            Some(raw) => parse_duration(raw)?,
            None => Duration::ZERO,
        };
        let cache_size = settings.cache.size.unwrap_or(0);
        if cache_ttl.is_zero() != (cache_size == 0) {
            return Err(ConfigError::InconsistentCacheSettings {
                ttl_secs: cache_ttl.as_secs(),
                size: cache_size,
            });
        }

        let allowed_algorithms = if settings.allowed_algorithms.is_empty() {
            vec![jsonwebtoken::Algorithm::RS256]
        } else {
            settings
                .allowed_algorithms
                .iter()
                .filter_map(|name| algorithm_from_name(name))
                .collect()
        };

        let empty_fallbacks: Vec<String> = Vec::new();
        let sub_fallback = fallback_claim_names.get("principal").unwrap_or(&empty_fallbacks);
        let groups_fallback = fallback_claim_names.get("groups").unwrap_or(&empty_fallbacks);
        let dn_fallback = fallback_claim_names.get("dn").unwrap_or(&empty_fallbacks);
        let mail_fallback = fallback_claim_names.get("mail").unwrap_or(&empty_fallbacks);
        let name_fallback = fallback_claim_names.get("name").unwrap_or(&empty_fallbacks);

        Ok(Self {
            allowed_clock_skew: parse_duration(&settings.allowed_clock_skew)?,
            populate_user_metadata: settings.populate_user_metadata,
            client_auth_scheme,
            cache_ttl,
            cache_size,
            issuer: settings.issuer.clone(),
            audiences: settings.audiences.clone(),
            allowed_algorithms,
            principal_parser: ClaimParser::new(
                "claims.principal",
                settings.claims.principal.as_deref(),
                sub_fallback,
                true,
            )?,
            groups_parser: ClaimParser::new("claims.groups", settings.claims.groups.as_deref(), groups_fallback, false)?,
            dn_parser: ClaimParser::new("claims.dn", settings.claims.dn.as_deref(), dn_fallback, false)?,
            mail_parser: ClaimParser::new("claims.mail", settings.claims.mail.as_deref(), mail_fallback, false)?,
            name_parser: ClaimParser::new("claims.name", settings.claims.name.as_deref(), name_fallback, false)?,
            fallback_claim_names,
        })
    }
}

fn algorithm_from_name(name: &str) -> Option<jsonwebtoken::Algorithm> {
    use jsonwebtoken::Algorithm::*;
    match name.to_ascii_uppercase().as_str() {
        "HS256" => Some(HS256),
        "HS384" => Some(HS384),
        "HS512" => Some(HS512),
        "RS256" => Some(RS256),
        "RS384" => Some(RS384),
        "RS512" => Some(RS512),
        "ES256" => Some(ES256),
        "ES384" => Some(ES384),
        _ => None,
    }
}
