//! Folio Content Store Layer
//!
//! Provides:
//! - `ContentStore`: per-path fetch / versioned write / delete
//! - GitHub contents API backend
//! - Local directory backend (offline editing)
//! - In-memory backend (tests)

mod credential;
mod github;
mod local;
mod memory;

pub use credential::Credential;
pub use github::{GithubStore, GithubTarget};
pub use local::LocalDirStore;
pub use memory::{MemoryStore, FailureMode};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Credential rejected")]
    Unauthorized,

    #[error("API error {status} for {path}: {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },

    #[error("Invalid payload for {path}: {message}")]
    Payload { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl StoreError {
    /// 401-class failure: the stored credential must be discarded
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Opaque per-path version identifier (blob sha, content hash, counter)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(pub String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current content of a path
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    pub version: VersionTag,
}

/// Result of a conditional write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Content stored; the path now carries this version
    Written(VersionTag),
    /// The path changed since `expected` was read (or appeared/vanished)
    Conflict { current: Option<VersionTag> },
}

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

/// Remote content store.
///
/// `write` with `expected = None` means "create"; it conflicts if the path
/// already exists. With `Some(tag)` it conflicts unless the stored version
/// still equals `tag`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a path; `Ok(None)` when absent
    async fn fetch(&self, path: &str) -> Result<Option<RemoteFile>>;

    /// Conditionally create or update a path
    async fn write(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&VersionTag>,
        message: &str,
    ) -> Result<WriteOutcome>;

    /// Delete a path; absence is not an error
    async fn delete(&self, path: &str, message: &str) -> Result<DeleteOutcome>;

    /// Current version of a path without caring about the content
    async fn version_of(&self, path: &str) -> Result<Option<VersionTag>> {
        Ok(self.fetch(path).await?.map(|f| f.version))
    }
}

/// Reject absolute paths and parent traversal before touching any backend
pub(crate) fn validate_path(path: &str) -> Result<()> {
    if path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("photos/trips/001.jpg").is_ok());
        assert!(validate_path("photos.json").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/etc/passwd").is_err());
        assert!(validate_path("photos/../secret").is_err());
        assert!(validate_path("photos//a.jpg").is_err());
    }
}
