//! Core types for the Drive client

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Long-lived credentials used to mint short-lived access tokens
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// A bearer token and the instant it stops being usable
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Response from the `files` query endpoint
#[derive(Debug, Deserialize)]
pub struct FileList {
    pub files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
pub struct FileRef {
    pub id: String,
}

/// Values held in the shared expiring cache.
///
/// Token and path entries live in one store, namespaced by key prefix
/// (`gd:access-token` vs `gd:path-id:`); the prefixes must not collide.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Token(AccessToken),
    ObjectId(String),
}
