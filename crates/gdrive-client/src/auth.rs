//! Access-token lifecycle
//!
//! Exchanges a long-lived refresh credential for short-lived bearer tokens
//! and keeps the current one where every request handler can reach it.

use crate::error::{DriveError, Result};
use crate::types::{AccessToken, CacheValue, Credentials, TokenResponse};
use chrono::Utc;
use expiring_cache::ExpiringCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// Seconds a freshly minted token is treated as valid. Provider tokens
/// nominally live 3600 seconds; stopping short avoids edge-of-expiry
/// failures. The advertised lifetime in the response is ignored.
const ACCESS_TOKEN_LIFETIME_SECS: u64 = 3500;

/// Fixed key for the shared token in the expiring cache.
const ACCESS_TOKEN_CACHE_KEY: &str = "gd:access-token";

/// Google's OAuth2 token endpoint.
pub(crate) const GOOGLE_OAUTH_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";

/// Obtains and refreshes the bearer token for the Drive API.
pub struct CredentialManager {
    http: reqwest::Client,
    credentials: Credentials,
    token_url: String,
    current: RwLock<Option<AccessToken>>,
    cache: Arc<ExpiringCache<CacheValue>>,
}

impl CredentialManager {
    pub fn new(
        http: reqwest::Client,
        credentials: Credentials,
        cache: Arc<ExpiringCache<CacheValue>>,
    ) -> Self {
        Self::with_token_url(http, credentials, cache, GOOGLE_OAUTH_TOKEN_URL)
    }

    /// Like [`CredentialManager::new`] with the token endpoint pointed
    /// elsewhere. Used by tests.
    pub fn with_token_url(
        http: reqwest::Client,
        credentials: Credentials,
        cache: Arc<ExpiringCache<CacheValue>>,
        token_url: &str,
    ) -> Self {
        Self {
            http,
            credentials,
            token_url: token_url.to_string(),
            current: RwLock::new(None),
            cache,
        }
    }

    /// Return a bearer token that is valid right now.
    ///
    /// Checks the in-memory token first, then the shared cache, and only then
    /// performs the refresh round trip. Concurrent callers racing past the
    /// in-memory check may refresh redundantly; the last writer wins. Errors
    /// are propagated, never retried here — retry policy belongs to the
    /// caller.
    pub async fn ensure_valid_token(&self) -> Result<String> {
        let now = Utc::now();

        {
            let current = self.current.read().await;
            if let Some(token) = current.as_ref() {
                if token.is_valid(now) {
                    return Ok(token.token.clone());
                }
            }
        }

        // Another handler may have refreshed already; adopt its token.
        if let Some(CacheValue::Token(token)) = self.cache.get(ACCESS_TOKEN_CACHE_KEY).await {
            if token.is_valid(now) {
                let mut current = self.current.write().await;
                *current = Some(token.clone());
                return Ok(token.token);
            }
        }

        self.refresh().await
    }

    async fn refresh(&self) -> Result<String> {
        info!("Refreshing Drive access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| DriveError::Auth(format!("token endpoint unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(DriveError::Auth(format!(
                "token endpoint returned status {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::Auth(format!("malformed token response: {}", e)))?;

        let token = AccessToken {
            token: body.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(ACCESS_TOKEN_LIFETIME_SECS as i64),
        };

        {
            let mut current = self.current.write().await;
            *current = Some(token.clone());
        }
        self.cache
            .set(
                ACCESS_TOKEN_CACHE_KEY,
                CacheValue::Token(token.clone()),
                Duration::from_secs(ACCESS_TOKEN_LIFETIME_SECS),
            )
            .await;

        Ok(token.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_credentials() -> Credentials {
        Credentials {
            client_id: "client-1".to_string(),
            client_secret: "secret-1".to_string(),
            refresh_token: "refresh-1".to_string(),
        }
    }

    fn manager_for(server: &MockServer, cache: Arc<ExpiringCache<CacheValue>>) -> CredentialManager {
        CredentialManager::with_token_url(
            reqwest::Client::new(),
            test_credentials(),
            cache,
            &format!("{}/token", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_refresh_happens_once_for_repeated_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=client-1"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "ya29.one" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager_for(&server, Arc::new(ExpiringCache::new()));

        assert_eq!(manager.ensure_valid_token().await.unwrap(), "ya29.one");
        // Second call is served from memory, no further round trip.
        assert_eq!(manager.ensure_valid_token().await.unwrap(), "ya29.one");
    }

    #[tokio::test]
    async fn test_token_is_adopted_from_the_shared_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "ya29.shared" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(ExpiringCache::new());
        let first = manager_for(&server, cache.clone());
        first.ensure_valid_token().await.unwrap();

        // A second manager with an empty in-memory slot picks the token up
        // from the cache instead of refreshing again.
        let second = manager_for(&server, cache);
        assert_eq!(second.ensure_valid_token().await.unwrap(), "ya29.shared");
    }

    #[tokio::test]
    async fn test_error_status_surfaces_as_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let manager = manager_for(&server, Arc::new(ExpiringCache::new()));

        let err = manager.ensure_valid_token().await.unwrap_err();
        assert!(matches!(err, DriveError::Auth(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_missing_access_token_field_surfaces_as_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "token_type": "Bearer" })),
            )
            .mount(&server)
            .await;

        let manager = manager_for(&server, Arc::new(ExpiringCache::new()));

        let err = manager.ensure_valid_token().await.unwrap_err();
        match err {
            DriveError::Auth(msg) => assert!(msg.contains("malformed"), "got {}", msg),
            other => panic!("expected Auth error, got {:?}", other),
        }
    }
}
