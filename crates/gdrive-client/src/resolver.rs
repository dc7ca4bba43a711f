//! Slash-delimited path resolution against the Drive files tree

use crate::auth::CredentialManager;
use crate::error::{DriveError, Result};
use crate::types::{CacheValue, FileList};
use expiring_cache::ExpiringCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Resolved path ids stay cached for a day; the folder tree changes rarely
/// relative to request volume.
const PATH_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Maps slash-delimited paths to file ids by walking parent-child queries.
pub struct PathResolver {
    http: reqwest::Client,
    api_base: String,
    auth: Arc<CredentialManager>,
    cache: Arc<ExpiringCache<CacheValue>>,
}

impl PathResolver {
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        auth: Arc<CredentialManager>,
        cache: Arc<ExpiringCache<CacheValue>>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            auth,
            cache,
        }
    }

    /// Map `path` under the folder `root` to a file id.
    ///
    /// Walks one remote query per segment; each hop depends on the id the
    /// previous one produced, so the walk is strictly sequential. Only a
    /// fully resolved path is cached — a missing segment fails the whole
    /// lookup and leaves the cache untouched, so a path created upstream
    /// later is picked up on the next request.
    pub async fn resolve(&self, root: &str, path: &str, skip_cache: bool) -> Result<String> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let cache_key = format!("gd:path-id:{}:{}", root, segments.join("/"));

        if !skip_cache {
            if let Some(CacheValue::ObjectId(id)) = self.cache.get(&cache_key).await {
                debug!(path = %path, id = %id, "path id served from cache");
                return Ok(id);
            }
        }

        let mut id = root.to_string();
        for segment in &segments {
            id = self.lookup_child(&id, segment).await?;
        }

        self.cache
            .set(&cache_key, CacheValue::ObjectId(id.clone()), PATH_CACHE_TTL)
            .await;
        Ok(id)
    }

    /// Find the child of `parent` whose name is exactly `name`, excluding
    /// trashed items and including shared-drive items. The first match wins.
    async fn lookup_child(&self, parent: &str, name: &str) -> Result<String> {
        let token = self.auth.ensure_valid_token().await?;

        // A bare single quote would terminate the name literal in the query
        // grammar.
        let escaped = name.replace('\'', "\\'");
        let query = format!(
            "'{}' in parents and name = '{}' and trashed = false",
            parent, escaped
        );

        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DriveError::Api(format!(
                "files query returned status {}",
                response.status()
            )));
        }

        let list: FileList = response
            .json()
            .await
            .map_err(|e| DriveError::Api(format!("undecodable files response: {}", e)))?;

        match list.files.into_iter().next() {
            Some(file) => {
                debug!(parent = %parent, name = %name, id = %file.id, "resolved path segment");
                Ok(file.id)
            }
            None => Err(DriveError::NotFound(format!(
                "no entry named {:?} under {}",
                name, parent
            ))),
        }
    }
}
