//! Role resolution: either a configured role mapper, or a delegated
//! authorization lookup against another realm. Both are out-of-scope
//! collaborators here; this module defines only the narrow interfaces the
//! orchestrator calls through, plus no-op defaults.

use crate::error::InfraError;
use crate::metadata::Metadata;
use crate::user::User;
use async_trait::async_trait;

/// Turns `(principal, distinguished_name, groups, metadata)` into a role set.
#[async_trait]
pub trait RoleMapper: Send + Sync {
    async fn resolve_roles(
        &self,
        principal: &str,
        dn: Option<&str>,
        groups: &[String],
        metadata: &Metadata,
    ) -> Result<Vec<String>, InfraError>;
}

/// Used when no role mapper is configured: every principal maps to no roles.
pub struct NoOpRoleMapper;

#[async_trait]
impl RoleMapper for NoOpRoleMapper {
    async fn resolve_roles(
        &self,
        _principal: &str,
        _dn: Option<&str>,
        _groups: &[String],
        _metadata: &Metadata,
    ) -> Result<Vec<String>, InfraError> {
        Ok(Vec::new())
    }
}

/// Resolves a principal's full [`User`] by delegating to another configured
/// realm, bypassing this realm's own role-mapper/claim path entirely.
#[async_trait]
pub trait DelegatedAuthorization: Send + Sync {
    /// Whether this instance actually delegates (vs. being the no-op variant
    /// used when unlicensed or unconfigured, so the orchestrator's branching
    /// stays single-shape).
    fn has_delegation(&self) -> bool;

    async fn resolve(&self, principal: &str) -> Result<User, InfraError>;
}

/// Present when unlicensed or unconfigured.
pub struct NoOpDelegatedAuthorization;

#[async_trait]
impl DelegatedAuthorization for NoOpDelegatedAuthorization {
    fn has_delegation(&self) -> bool {
        false
    }

    async fn resolve(&self, principal: &str) -> Result<User, InfraError> {
        Err(InfraError::DelegatedAuthorization(format!(
            "no delegated authorization configured for principal '{principal}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_op_role_mapper_yields_no_roles() {
        let roles = NoOpRoleMapper
            .resolve_roles("alice", None, &[], &Metadata::new())
            .await
            .unwrap();
        assert!(roles.is_empty());
    }

    #[test]
    fn no_op_delegated_authorization_reports_no_delegation() {
        assert!(!NoOpDelegatedAuthorization.has_delegation());
    }
}
