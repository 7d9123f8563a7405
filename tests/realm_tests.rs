#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use jwtrealm::claim_parser::ClaimParser;
use jwtrealm::client_auth::ClientAuthScheme;
use jwtrealm::config::RealmConfig;
use jwtrealm::keystore::StaticKeySet;
use jwtrealm::realm::JwtRealm;
use jwtrealm::role::DelegatedAuthorization;
use jwtrealm::token::BearerToken;
use jwtrealm::{AuthenticationResult, InfraError, User};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").try_init();
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

fn secret() -> &'static [u8] {
    b"s3cr3t"
}

fn sign(claims: serde_json::Value) -> Vec<u8> {
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret()))
        .unwrap()
        .into_bytes()
}

fn config(client_auth_scheme: ClientAuthScheme) -> RealmConfig {
    RealmConfig {
        allowed_clock_skew: Duration::from_secs(0),
        populate_user_metadata: true,
        client_auth_scheme,
        cache_ttl: Duration::from_secs(600),
        cache_size: 100,
        issuer: "https://issuer.example".to_string(),
        audiences: vec!["my-api".to_string()],
        allowed_algorithms: vec![Algorithm::HS256],
        principal_parser: ClaimParser::new("claims.principal", Some("sub"), &[], true).unwrap(),
        groups_parser: ClaimParser::new("claims.groups", Some("groups"), &[], false).unwrap(),
        dn_parser: ClaimParser::new("claims.dn", None, &[], false).unwrap(),
        mail_parser: ClaimParser::new("claims.mail", None, &[], false).unwrap(),
        name_parser: ClaimParser::new("claims.name", None, &[], false).unwrap(),
        fallback_claim_names: Default::default(),
    }
}

fn new_realm(client_auth_scheme: ClientAuthScheme) -> JwtRealm {
    let realm = JwtRealm::new(config(client_auth_scheme), Arc::new(StaticKeySet::single_secret(secret())));
    realm.initialize().unwrap();
    realm
}

/// S1: happy path, no client auth.
#[tokio::test]
async fn happy_path_produces_success_and_populates_cache() {
    init_tracing();
    let realm = new_realm(ClientAuthScheme::None);
    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() + 300,
            "groups": ["g1"],
        })),
        None,
    );

    assert_eq!(realm.usage_stats()["jwt"]["cache"]["size"], 0);
    let result = realm.authenticate(&token).await.unwrap();
    let AuthenticationResult::Success(user) = result else {
        panic!("expected success, got {result:?}");
    };
    assert_eq!(user.principal, "alice");
    assert!(user.enabled);
    assert_eq!(realm.usage_stats()["jwt"]["cache"]["size"], 1);
}

/// S2: cache hit returns an equal user on the second call.
#[tokio::test]
async fn repeat_authentication_hits_the_cache() {
    let realm = new_realm(ClientAuthScheme::None);
    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() + 300,
        })),
        None,
    );

    let AuthenticationResult::Success(first) = realm.authenticate(&token).await.unwrap() else {
        panic!("expected success");
    };
    let AuthenticationResult::Success(second) = realm.authenticate(&token).await.unwrap() else {
        panic!("expected success");
    };
    assert_eq!(first, second);
}

/// S3: bad client secret short-circuits before JWT validation; cache untouched.
#[tokio::test]
async fn bad_client_secret_short_circuits() {
    let realm = new_realm(ClientAuthScheme::SharedSecret(b"S3cr3t".to_vec()));
    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() + 300,
        })),
        Some(b"wrong".to_vec()),
    );

    let result = realm.authenticate(&token).await.unwrap();
    match result {
        AuthenticationResult::Unsuccessful { message, .. } => {
            assert!(message.contains("client authentication"));
        }
        other => panic!("expected unsuccessful, got {other:?}"),
    }
    assert_eq!(realm.usage_stats()["jwt"]["cache"]["size"], 0);
}

/// S4: expired token with zero skew is rejected; cache stays empty.
#[tokio::test]
async fn expired_token_is_rejected() {
    let realm = new_realm(ClientAuthScheme::None);
    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() - 1,
        })),
        None,
    );

    let result = realm.authenticate(&token).await.unwrap();
    assert!(matches!(result, AuthenticationResult::Unsuccessful { .. }));
    assert_eq!(realm.usage_stats()["jwt"]["cache"]["size"], 0);
}

/// S6: metadata filter drops nested maps, nulls, and heterogeneous arrays.
#[tokio::test]
async fn metadata_filter_keeps_only_eligible_claims() {
    let realm = new_realm(ClientAuthScheme::None);
    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() + 300,
            "nested": {"k": "v"},
            "nums": [1, 2, 3],
            "mixed": ["a", {"x": 1}],
            "null_val": null,
            "s": "x",
        })),
        None,
    );

    let AuthenticationResult::Success(user) = realm.authenticate(&token).await.unwrap() else {
        panic!("expected success");
    };
    let mut keys: Vec<_> = user.metadata.keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "jwt_claim_nums".to_string(),
            "jwt_claim_s".to_string(),
            "jwt_token_type".to_string(),
        ]
    );
}

/// Invariant: an expired entry never causes success even with caching enabled.
#[tokio::test]
async fn cache_never_masks_an_expired_token() {
    let realm = new_realm(ClientAuthScheme::None);
    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() - 1,
        })),
        None,
    );
    realm.authenticate(&token).await.unwrap();
    let result = realm.authenticate(&token).await.unwrap();
    assert!(matches!(result, AuthenticationResult::Unsuccessful { .. }));
}

/// Invariant: `expire_all` empties the cache and the next call revalidates.
#[tokio::test]
async fn expire_all_forces_cache_count_to_zero() {
    let realm = new_realm(ClientAuthScheme::None);
    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() + 300,
        })),
        None,
    );
    realm.authenticate(&token).await.unwrap();
    assert_eq!(realm.usage_stats()["jwt"]["cache"]["size"], 1);
    realm.expire_all();
    assert_eq!(realm.usage_stats()["jwt"]["cache"]["size"], 0);
}

/// Usage stats expose the full cache statistics, not just size.
#[tokio::test]
async fn usage_stats_reports_hits_misses_and_capacity() {
    let realm = new_realm(ClientAuthScheme::None);
    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() + 300,
        })),
        None,
    );
    realm.authenticate(&token).await.unwrap(); // miss, then insert
    realm.authenticate(&token).await.unwrap(); // hit

    let stats = realm.usage_stats();
    assert_eq!(stats["jwt"]["cache"]["size"], 1);
    assert_eq!(stats["jwt"]["cache"]["hits"], 1);
    assert_eq!(stats["jwt"]["cache"]["misses"], 1);
    assert_eq!(stats["jwt"]["cache"]["evictions"], 0);
    assert_eq!(stats["jwt"]["cache"]["capacity"], 100);
}

#[test]
fn initialize_gate_rejects_a_second_call() {
    let realm = JwtRealm::new(config(ClientAuthScheme::None), Arc::new(StaticKeySet::single_secret(secret())));
    realm.initialize().unwrap();
    assert!(realm.initialize().is_err());
}

/// A delegated authorization stub that counts calls and rewrites the principal,
/// so the cache-hit path can be told apart from the miss path.
struct CountingDelegate {
    calls: AtomicUsize,
}

#[async_trait]
impl DelegatedAuthorization for CountingDelegate {
    fn has_delegation(&self) -> bool {
        true
    }

    async fn resolve(&self, principal: &str) -> Result<User, InfraError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(User::new(format!("{principal}'"), vec!["delegated".to_string()]))
    }
}

/// S5: with delegated authorization configured, a cache hit still invokes the
/// delegate (keyed by the cached principal), while the JWT authenticator does not
/// re-verify.
#[tokio::test]
async fn delegated_authorization_runs_on_every_call_even_on_cache_hit() {
    let delegate = Arc::new(CountingDelegate {
        calls: AtomicUsize::new(0),
    });
    let realm = JwtRealm::new(config(ClientAuthScheme::None), Arc::new(StaticKeySet::single_secret(secret())))
        .with_delegated_authorization(delegate.clone());
    realm.initialize().unwrap();

    let token = BearerToken::new(
        "<bearer>",
        sign(json!({
            "sub": "bob",
            "iss": "https://issuer.example",
            "aud": "my-api",
            "exp": now_unix() + 300,
        })),
        None,
    );

    let AuthenticationResult::Success(first) = realm.authenticate(&token).await.unwrap() else {
        panic!("expected success");
    };
    assert_eq!(first.principal, "bob'");
    assert_eq!(delegate.calls.load(Ordering::SeqCst), 1);

    let AuthenticationResult::Success(second) = realm.authenticate(&token).await.unwrap() else {
        panic!("expected success");
    };
    assert_eq!(second.principal, "bob'");
    assert_eq!(delegate.calls.load(Ordering::SeqCst), 2);
}
