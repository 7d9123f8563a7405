//! # jwtrealm
//!
//! **jwtrealm** is a pluggable JWT bearer-token authentication realm: it
//! validates a signed JWT plus an optional client-authentication secret,
//! resolves a user principal and roles, and returns an authentication
//! result to whatever request pipeline embeds it.
//!
//! ## Architecture
//!
//! - **[`token`]** - the inbound credential type (`AuthenticationToken`, `BearerToken`)
//! - **[`client_auth`]** - the sidecar shared-secret check, independent of the JWT itself
//! - **[`keystore`]** - key material for signature verification (static secrets, JWKS)
//! - **[`jwt`]** - signature and standard-claim verification (`JwtAuthenticator`)
//! - **[`claims`]** - the decoded JWT payload as a claim-name to value mapping
//! - **[`claim_parser`]** - resolves a single claim (principal, groups, dn, mail, name) with fallbacks
//! - **[`metadata`]** - filters claims into the `jwt_claim_*` user-metadata mapping
//! - **[`role`]** - role-mapper and delegated-authorization collaborator traits
//! - **[`cache`]** - the bounded, TTL-expiring fingerprint-to-user cache
//! - **[`user`]** - the resolved `User` and `AuthenticationResult`
//! - **[`config`]** - settings parsing and validation (`RealmConfig`)
//! - **[`realm`]** - `JwtRealm`, the orchestrating entry point
//! - **[`error`]** - the typed error enums for every fallible boundary
//!
//! Out of scope: the transport layer that extracts headers and constructs an
//! `AuthenticationToken`; the HTTPS client behind JWKS refresh (only the
//! narrow [`keystore::KeyStore`] interface is in scope); multi-realm token
//! dispatch; JWT issuance; and user-record storage.

pub mod cache;
pub mod claim_parser;
pub mod claims;
pub mod client_auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod keystore;
pub mod metadata;
pub mod realm;
pub mod role;
pub mod token;
pub mod user;

pub use error::{ClaimError, ClientAuthError, ConfigError, InfraError, JwtError, RealmError};
pub use realm::JwtRealm;
pub use token::{AuthenticationToken, BearerToken};
pub use user::{AuthenticationResult, User};
