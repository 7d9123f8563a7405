//! The authenticated principal and the outcome returned to the surrounding
//! authentication framework.

use crate::metadata::Metadata;

/// The resolved identity of an authenticated subject.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub principal: String,
    pub roles: Vec<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub metadata: Metadata,
    pub enabled: bool,
}

impl User {
    #[must_use]
    pub fn new(principal: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            principal: principal.into(),
            roles,
            full_name: None,
            email: None,
            metadata: Metadata::new(),
            enabled: true,
        }
    }

    #[must_use]
    pub fn with_full_name(mut self, full_name: Option<String>) -> Self {
        self.full_name = full_name;
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The three-state outcome of an authenticate call. `Continue` exists for
/// symmetry with other realm kinds in a multi-realm chain; this realm never
/// emits it — every supported token produces `Success` or `Unsuccessful`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationResult {
    Success(User),
    Unsuccessful { message: String, cause: Option<String> },
    Continue,
}

impl AuthenticationResult {
    #[must_use]
    pub fn unsuccessful(message: impl Into<String>) -> Self {
        Self::Unsuccessful {
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn unsuccessful_with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Unsuccessful {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
