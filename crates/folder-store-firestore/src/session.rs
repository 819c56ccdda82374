//! Firebase Auth session with ID token caching and refresh.
//!
//! Exchanges a long-lived refresh token at the Secure Token endpoint, caches
//! the resulting ID token in-memory, and refreshes it when close to expiry or
//! when the caller forces it.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use folder_store_core::{Session, StoreError};
use serde::Deserialize;
use tracing::{debug, info};

/// Public Secure Token endpoint.
pub const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Cached ID token with expiration.
#[derive(Debug, Clone)]
struct CachedToken {
    id_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::minutes(5)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    user_id: Option<String>,
    refresh_token: Option<String>,
    cached: Option<CachedToken>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    /// Seconds, sent as a string.
    expires_in: String,
    user_id: String,
}

/// `Session` backed by a Firebase Auth refresh token.
pub struct FirebaseSession {
    http: reqwest::Client,
    api_key: String,
    token_url: String,
    state: RwLock<SessionState>,
}

impl FirebaseSession {
    /// Sign in with a refresh token against the public endpoint.
    pub async fn sign_in(
        http: reqwest::Client,
        api_key: String,
        refresh_token: String,
    ) -> Result<Self, StoreError> {
        Self::sign_in_with_url(http, SECURE_TOKEN_URL, api_key, refresh_token).await
    }

    /// Sign in against a custom token endpoint (emulator, tests).
    pub async fn sign_in_with_url(
        http: reqwest::Client,
        token_url: &str,
        api_key: String,
        refresh_token: String,
    ) -> Result<Self, StoreError> {
        let session = Self {
            http,
            api_key,
            token_url: token_url.to_string(),
            state: RwLock::new(SessionState {
                user_id: None,
                refresh_token: Some(refresh_token),
                cached: None,
            }),
        };
        session.refresh().await?;
        Ok(session)
    }

    /// Drop the user and every credential.
    pub fn sign_out(&self) {
        let mut state = self.state.write().expect("session state poisoned");
        if let Some(user_id) = state.user_id.take() {
            info!("Signed out user {}", user_id);
        }
        state.refresh_token = None;
        state.cached = None;
    }

    fn cached_token(&self) -> Option<String> {
        let state = self.state.read().expect("session state poisoned");
        state
            .cached
            .as_ref()
            .filter(|cached| !cached.is_expired())
            .map(|cached| cached.id_token.clone())
    }

    /// Exchange the refresh token for a new ID token.
    async fn refresh(&self) -> Result<String, StoreError> {
        let refresh_token = {
            let state = self.state.read().expect("session state poisoned");
            state
                .refresh_token
                .clone()
                .ok_or(StoreError::AuthenticationMissing)?
        };

        let resp = self
            .http
            .post(&self.token_url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Io(format!("Token refresh request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                message: format!("Token refresh failed: {}", body),
            });
        }

        let token_resp: RefreshResponse = resp.json().await.map_err(|e| {
            StoreError::Serialization(format!("Failed to decode token response: {}", e))
        })?;

        let expires_in: i64 = token_resp.expires_in.parse().map_err(|_| {
            StoreError::InvalidData(format!("bad expires_in: {}", token_resp.expires_in))
        })?;
        let expires_at = Utc::now() + Duration::seconds(expires_in);

        let mut state = self.state.write().expect("session state poisoned");
        // A sign-out raced with this refresh; do not resurrect the session.
        if state.refresh_token.is_none() {
            return Err(StoreError::AuthenticationMissing);
        }
        state.user_id = Some(token_resp.user_id.clone());
        // Firebase may rotate the refresh token
        state.refresh_token = Some(token_resp.refresh_token);
        state.cached = Some(CachedToken {
            id_token: token_resp.id_token.clone(),
            expires_at,
        });

        info!(
            "Refreshed ID token for user {}, expires at {}",
            token_resp.user_id,
            expires_at.to_rfc3339()
        );
        Ok(token_resp.id_token)
    }
}

#[async_trait]
impl Session for FirebaseSession {
    fn user_id(&self) -> Option<String> {
        self.state
            .read()
            .expect("session state poisoned")
            .user_id
            .clone()
    }

    async fn id_token(&self, force_refresh: bool) -> Result<String, StoreError> {
        if !force_refresh {
            if let Some(token) = self.cached_token() {
                debug!("ID token cache hit");
                return Ok(token);
            }
        }
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token_endpoint(server: &MockServer, expires_in: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .and(query_param("key", "api-key"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "id-1",
                "refresh_token": "rt-2",
                "expires_in": expires_in,
                "token_type": "Bearer",
                "user_id": "user-1"
            })))
            .mount(server)
            .await;
    }

    async fn sign_in(server: &MockServer) -> Result<FirebaseSession, StoreError> {
        FirebaseSession::sign_in_with_url(
            reqwest::Client::new(),
            &format!("{}/v1/token", server.uri()),
            "api-key".to_string(),
            "rt-1".to_string(),
        )
        .await
    }

    #[tokio::test]
    async fn test_sign_in_sets_user() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, "3600").await;

        let session = sign_in(&server).await.unwrap();
        assert_eq!(session.user_id().as_deref(), Some("user-1"));
        assert_eq!(session.id_token(false).await.unwrap(), "id-1");

        // Sign-in plus nothing else: the second call was served from cache.
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, "3600").await;

        let session = sign_in(&server).await.unwrap();
        session.id_token(true).await.unwrap();
        session.id_token(true).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        // The rotated refresh token is used after the first exchange.
        let last_body = String::from_utf8_lossy(&requests[2].body).to_string();
        assert!(last_body.contains("refresh_token=rt-2"));
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refreshed() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, "60").await;

        let session = sign_in(&server).await.unwrap();
        session.id_token(false).await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, "3600").await;

        let session = sign_in(&server).await.unwrap();
        session.sign_out();
        assert!(session.user_id().is_none());
        assert!(matches!(
            session.id_token(false).await,
            Err(StoreError::AuthenticationMissing)
        ));
    }

    #[tokio::test]
    async fn test_rejected_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("TOKEN_EXPIRED"))
            .mount(&server)
            .await;

        match sign_in(&server).await {
            Err(StoreError::Http { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("TOKEN_EXPIRED"));
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("sign-in should fail"),
        }
    }
}
