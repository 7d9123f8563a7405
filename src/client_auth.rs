//! Validates the sidecar client credential, a second and orthogonal
//! credential check from the bearer JWT itself.

use crate::error::ClientAuthError;

/// The configured client-authentication scheme.
#[derive(Debug, Clone)]
pub enum ClientAuthScheme {
    None,
    SharedSecret(Vec<u8>),
}

/// Constant-time byte comparison: every byte pair is compared regardless of
/// an early mismatch, so timing does not leak the position of the first
/// differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Stateless: validates a presented secret against the configured scheme.
pub struct ClientAuthenticator {
    scheme: ClientAuthScheme,
}

impl ClientAuthenticator {
    #[must_use]
    pub fn new(scheme: ClientAuthScheme) -> Self {
        Self { scheme }
    }

    pub fn authenticate(&self, presented: Option<&[u8]>) -> Result<(), ClientAuthError> {
        match &self.scheme {
            ClientAuthScheme::None => match presented {
                None => Ok(()),
                Some(secret) if secret.is_empty() => Ok(()),
                Some(_) => Err(ClientAuthError::UnexpectedSecret),
            },
            ClientAuthScheme::SharedSecret(configured) => match presented {
                None => Err(ClientAuthError::MissingSecret),
                Some(secret) if constant_time_eq(secret, configured) => Ok(()),
                Some(_) => Err(ClientAuthError::SecretMismatch),
            },
        }
    }
}
