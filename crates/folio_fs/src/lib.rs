//! Folio File System Layer
//!
//! Provides:
//! - Album slug sanitization
//! - Natural filename ordering
//! - Photo tree scanning for the initial manifest

mod sanitize;
mod natural;
mod scan;

pub use sanitize::{sanitize_slug, is_valid_slug, is_reserved_slug, RESERVED_SLUGS};
pub use natural::{natural_cmp, natural_sort_key, NaturalSortPart};
pub use scan::{scan_photo_tree, ScanOptions, ScannedAlbum, ScannedPhoto, UNSORTED_FOLDER};

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Cannot read image {path}: {message}")]
    Image { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, FsError>;
