//! High-level Drive client tying auth, resolution and download together

use crate::auth::{CredentialManager, GOOGLE_OAUTH_TOKEN_URL};
use crate::error::Result;
use crate::resolver::PathResolver;
use crate::types::Credentials;
use expiring_cache::ExpiringCache;
use std::sync::Arc;
use tracing::debug;

/// Base URL for the Drive v3 API.
const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";

/// Client for reading files out of Drive by path or id.
///
/// One instance is constructed at startup and shared by every request
/// handler; all mutable state (the current token, the resolution cache)
/// lives behind its own locks.
pub struct DriveClient {
    http: reqwest::Client,
    api_base: String,
    auth: Arc<CredentialManager>,
    resolver: PathResolver,
    skip_cache: bool,
}

impl DriveClient {
    /// Build a client against the real Google endpoints.
    pub fn new(credentials: Credentials, skip_cache: bool) -> Self {
        Self::with_base_urls(credentials, skip_cache, DRIVE_API_URL, GOOGLE_OAUTH_TOKEN_URL)
    }

    /// Like [`DriveClient::new`] with both endpoints pointed elsewhere.
    /// Used by tests.
    pub fn with_base_urls(
        credentials: Credentials,
        skip_cache: bool,
        api_base: &str,
        token_url: &str,
    ) -> Self {
        let http = reqwest::Client::new();
        let cache = Arc::new(ExpiringCache::new());
        let auth = Arc::new(CredentialManager::with_token_url(
            http.clone(),
            credentials,
            cache.clone(),
            token_url,
        ));
        let resolver = PathResolver::new(http.clone(), api_base, auth.clone(), cache);

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            auth,
            resolver,
            skip_cache,
        }
    }

    /// Download a file's media content, forwarding the caller's Range header
    /// verbatim when present.
    ///
    /// The response is returned as-is; the caller decides what a non-success
    /// status means.
    pub async fn download(&self, id: &str, range: Option<&str>) -> Result<reqwest::Response> {
        let token = self.auth.ensure_valid_token().await?;

        let mut request = self
            .http
            .get(format!("{}/files/{}", self.api_base, id))
            .query(&[
                ("alt", "media"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .bearer_auth(token);
        if let Some(range) = range {
            request = request.header(reqwest::header::RANGE, range);
        }

        debug!(id = %id, range = range.unwrap_or(""), "downloading file media");
        Ok(request.send().await?)
    }

    /// Resolve `path` under the folder `root`, then download the resolved
    /// file.
    pub async fn download_by_path(
        &self,
        path: &str,
        range: Option<&str>,
        root: &str,
    ) -> Result<reqwest::Response> {
        let id = self.resolver.resolve(root, path, self.skip_cache).await?;
        self.download(&id, range).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriveError;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_credentials() -> Credentials {
        Credentials {
            client_id: "c".to_string(),
            client_secret: "s".to_string(),
            refresh_token: "r".to_string(),
        }
    }

    async fn mount_token_endpoint(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "ya29.test" })),
            )
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> DriveClient {
        DriveClient::with_base_urls(
            test_credentials(),
            false,
            &server.uri(),
            &format!("{}/token", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_download_requests_media_with_bearer_token() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("GET"))
            .and(path("/files/f1"))
            .and(query_param("alt", "media"))
            .and(header("authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("bytes"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);

        let response = client.download("f1", None).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.text().await.unwrap(), "bytes");
    }

    #[tokio::test]
    async fn test_download_forwards_range_header() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("GET"))
            .and(path("/files/f1"))
            .and(header("range", "bytes=0-3"))
            .respond_with(ResponseTemplate::new(206).set_body_string("byte"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);

        let response = client.download("f1", Some("bytes=0-3")).await.unwrap();
        assert_eq!(response.status().as_u16(), 206);
    }

    #[tokio::test]
    async fn test_download_by_path_resolves_then_fetches() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param(
                "q",
                "'root1' in parents and name = 'movie.mp4' and trashed = false",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "files": [{ "id": "f1" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/f1"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_string("movie bytes"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);

        let response = client
            .download_by_path("/movie.mp4", None, "root1")
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "movie bytes");
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let err = client
            .download_by_path("/movie.mp4", None, "root1")
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::Auth(_)), "got {:?}", err);
    }
}
