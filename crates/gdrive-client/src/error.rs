//! Error types for the Drive client

use std::fmt;

#[derive(Debug)]
pub enum DriveError {
    /// Transport-level failure talking to the provider
    Http(Box<reqwest::Error>),
    /// Provider answered, but not with a usable response
    Api(String),
    /// Token endpoint unreachable, malformed, or missing the access token
    Auth(String),
    /// A path segment has no matching child
    NotFound(String),
}

impl fmt::Display for DriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveError::Http(err) => write!(f, "HTTP error: {}", err),
            DriveError::Api(msg) => write!(f, "Drive API error: {}", msg),
            DriveError::Auth(msg) => write!(f, "Token refresh error: {}", msg),
            DriveError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for DriveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriveError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        DriveError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, DriveError>;
