use async_trait::async_trait;

use crate::error::StoreError;

/// Authenticated user context passed explicitly into every folder operation.
#[async_trait]
pub trait Session: Send + Sync {
    /// ID of the signed-in user, or `None` when nobody is signed in.
    fn user_id(&self) -> Option<String>;

    /// Bearer credential for the signed-in user.
    ///
    /// When `force_refresh` is set, implementations must not serve a cached token.
    async fn id_token(&self, force_refresh: bool) -> Result<String, StoreError>;

    /// User ID, failing with `AuthenticationMissing` when nobody is signed in.
    fn require_user(&self) -> Result<String, StoreError> {
        self.user_id().ok_or(StoreError::AuthenticationMissing)
    }
}

/// A session with a fixed user and token.
#[derive(Debug, Clone)]
pub struct StaticSession {
    user_id: String,
    token: String,
}

impl StaticSession {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl Session for StaticSession {
    fn user_id(&self) -> Option<String> {
        Some(self.user_id.clone())
    }

    async fn id_token(&self, _force_refresh: bool) -> Result<String, StoreError> {
        Ok(self.token.clone())
    }
}

/// A session with nobody signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousSession;

#[async_trait]
impl Session for AnonymousSession {
    fn user_id(&self) -> Option<String> {
        None
    }

    async fn id_token(&self, _force_refresh: bool) -> Result<String, StoreError> {
        Err(StoreError::AuthenticationMissing)
    }
}
