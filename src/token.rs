//! The inbound credential the realm authenticates.

/// Opaque to the realm except for these accessors. The transport layer that
/// parses `Authorization`/`ES-Client-Authentication` headers and constructs
/// one is out of scope here.
pub trait AuthenticationToken: Send + Sync {
    /// A display principal, safe to log (never the raw JWT).
    fn principal(&self) -> &str;

    /// The serialized JWT bytes. Treated as secret; never logged.
    fn bearer_token(&self) -> &[u8];

    /// The `ES-Client-Authentication` shared secret, if one was presented.
    fn client_secret(&self) -> Option<&[u8]>;
}

/// The concrete token type the transport layer hands the realm.
#[derive(Debug, Clone)]
pub struct BearerToken {
    principal_hint: String,
    jwt: Vec<u8>,
    client_secret: Option<Vec<u8>>,
}

impl BearerToken {
    #[must_use]
    pub fn new(principal_hint: impl Into<String>, jwt: Vec<u8>, client_secret: Option<Vec<u8>>) -> Self {
        Self {
            principal_hint: principal_hint.into(),
            jwt,
            client_secret,
        }
    }
}

impl AuthenticationToken for BearerToken {
    fn principal(&self) -> &str {
        &self.principal_hint
    }

    fn bearer_token(&self) -> &[u8] {
        &self.jwt
    }

    fn client_secret(&self) -> Option<&[u8]> {
        self.client_secret.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_round_trip() {
        let token = BearerToken::new("<bearer>", b"abc.def.ghi".to_vec(), Some(b"s3cr3t".to_vec()));
        assert_eq!(token.principal(), "<bearer>");
        assert_eq!(token.bearer_token(), b"abc.def.ghi");
        assert_eq!(token.client_secret(), Some(b"s3cr3t".as_slice()));
    }

    #[test]
    fn client_secret_defaults_to_absent() {
        let token = BearerToken::new("<bearer>", b"abc.def.ghi".to_vec(), None);
        assert_eq!(token.client_secret(), None);
    }
}
