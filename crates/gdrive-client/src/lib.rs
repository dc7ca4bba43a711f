//! Google Drive v3 API client
//!
//! Keeps a short-lived bearer token fresh from a long-lived refresh
//! credential, resolves slash-delimited paths to opaque file ids one segment
//! at a time, and downloads file media with byte-range support. Token and
//! path lookups share one expiring cache, namespaced by key prefix.

pub mod auth;
pub mod client;
pub mod error;
pub mod resolver;
pub mod types;

pub use auth::CredentialManager;
pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use resolver::PathResolver;
pub use types::{AccessToken, CacheValue, Credentials};
