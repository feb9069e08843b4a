//! Application error types

use folio_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Which remote call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Fetch(String),
    Write(String),
    Delete(String),
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOp::Fetch(path) => write!(f, "fetching {}", path),
            RemoteOp::Write(path) => write!(f, "writing {}", path),
            RemoteOp::Delete(path) => write!(f, "deleting {}", path),
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum FolioError {
    // ===== Input validation (rejected locally, before any network call) =====
    #[error("Invalid album name: {0:?}")]
    InvalidAlbumName(String),

    #[error("Album already exists: {0}")]
    AlbumExists(String),

    #[error("Album name is reserved: {0}")]
    ReservedAlbumName(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Image too small: {width}x{height} (minimum {min})")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("Cannot decode image: {0}")]
    ImageDecode(String),

    // ===== Session state =====
    #[error("No edit session is active")]
    SessionInactive,

    #[error("An edit session is already active")]
    SessionActive,

    #[error("Editing requires a credential")]
    NoCredential,

    #[error("An upload is still in progress")]
    Busy,

    #[error("Album not found: {0}")]
    AlbumNotFound(String),

    #[error("Photo not found: {0}")]
    PhotoNotFound(String),

    #[error("Index {index} out of range for album {album} ({len} photos)")]
    IndexOutOfRange { album: String, index: usize, len: usize },

    // ===== Remote (transient, retryable) =====
    #[error("Failed {op}: {source}")]
    Remote {
        op: RemoteOp,
        #[source]
        source: StoreError,
    },

    #[error("Version conflict {0}: the file changed remotely")]
    Conflict(RemoteOp),

    // ===== Data =====
    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for folio operations
pub type Result<T> = std::result::Result<T, FolioError>;

impl FolioError {
    pub(crate) fn remote(op: RemoteOp, source: StoreError) -> Self {
        FolioError::Remote { op, source }
    }

    /// Rejected input; nothing was sent anywhere
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FolioError::InvalidAlbumName(_)
                | FolioError::AlbumExists(_)
                | FolioError::ReservedAlbumName(_)
                | FolioError::UnsupportedFormat(_)
                | FolioError::FileTooLarge { .. }
                | FolioError::ImageTooSmall { .. }
                | FolioError::ImageDecode(_)
        )
    }

    /// A remote call failed; the user may retry
    pub fn is_remote(&self) -> bool {
        matches!(self, FolioError::Remote { .. } | FolioError::Conflict(_))
    }

    /// The credential was rejected and must be discarded
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FolioError::Remote { source, .. } if source.is_unauthorized())
    }

    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FolioError::Config(_) | FolioError::Manifest(_))
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            FolioError::InvalidAlbumName(_) => "Album names need at least one letter or digit".to_string(),
            FolioError::AlbumExists(slug) => format!("An album named \"{}\" already exists", slug),
            FolioError::ReservedAlbumName(slug) => format!("\"{}\" is a reserved name", slug),
            FolioError::Remote { op, .. } if self.is_unauthorized() => {
                format!("Sign-in expired while {}. Enter a new token.", op)
            }
            FolioError::Remote { op, .. } => format!("Save failed while {}. Try again.", op),
            FolioError::Conflict(op) => {
                format!("Someone else changed the site while {}. Reload and retry.", op)
            }
            _ => self.to_string(),
        }
    }
}

impl From<image::ImageError> for FolioError {
    fn from(e: image::ImageError) -> Self {
        FolioError::ImageDecode(e.to_string())
    }
}

impl From<toml::de::Error> for FolioError {
    fn from(e: toml::de::Error) -> Self {
        FolioError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(FolioError::AlbumExists("trips".into()).is_validation());
        assert!(!FolioError::SessionInactive.is_validation());

        let err = FolioError::remote(RemoteOp::Write("photos.json".into()), StoreError::Unauthorized);
        assert!(err.is_remote());
        assert!(err.is_unauthorized());
        assert!(err.user_message().contains("writing photos.json"));

        let err = FolioError::Conflict(RemoteOp::Write("order.json".into()));
        assert!(err.is_remote());
        assert!(!err.is_unauthorized());
    }
}
