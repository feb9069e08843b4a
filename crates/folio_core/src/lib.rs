//! Folio Core Domain Logic
//!
//! This crate contains:
//! - Media catalog, pending journal and published artifacts
//! - Gesture arbitration, carousel, zoom/pan and morph transitions
//! - Edit session, uploads and remote commit
//! - Configuration
//! - Error types

pub mod animation;
pub mod carousel;
pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod input;
pub mod journal;
pub mod layout;
pub mod manifest;
pub mod morph;
pub mod overlay;
pub mod preload;
pub mod session;
pub mod state;
pub mod sync;
pub mod upload;
pub mod viewer;
pub mod zoom;

pub use animation::{AnimPhase, Animation, Easing};
pub use carousel::{NavVisibility, PageIndicator, Slot, VirtualCarousel};
pub use catalog::{Album, CatalogSnapshot, MediaCatalog, Photo, UNSORTED};
pub use command::{CommandId, KeyMap, ViewerCommand};
pub use config::{
    FolioConfig, GestureConfig, ScrollSign, StoreBackend, StoreConfig, UploadConfig, ViewerConfig,
};
pub use error::{FolioError, RemoteOp, Result};
pub use geometry::{Rect, Size, Vec2};
pub use gesture::{AlbumSwipe, AlbumSwipeIntent, GestureArbiter, GestureContext, GestureIntent, Step};
pub use input::InputEvent;
pub use journal::{merge_moves, DeleteEntry, MoveEntry, PendingJournal};
pub use layout::GridLayout;
pub use manifest::{decode_moves, encode_moves, ManifestEntry, OrderIndex, PhotoManifest};
pub use morph::{MorphDirection, MorphTransition, RevealOutcome};
pub use overlay::{OverlayHandle, OverlayHost, TransientOverlay};
pub use preload::{ImageLoader, PreloadCache};
pub use session::EditSession;
pub use state::GalleryState;
pub use sync::{commit_preview, CommitPreview, CommitReport, RemoteSyncCommitter};
pub use upload::{UploadFile, UploadPreviewCache};
pub use viewer::{Viewer, ViewerAction, ViewerState};
pub use zoom::ZoomPanController;
