//! Edit session
//!
//! Catalog edits are applied locally right away and journaled; nothing is
//! sent until `commit`. `cancel` restores the snapshot taken on `begin`,
//! except that photos uploaded during the session stay (their files already
//! exist remotely).

use crate::catalog::{CatalogSnapshot, MediaCatalog, Photo, UNSORTED};
use crate::config::{StoreConfig, UploadConfig};
use crate::error::{FolioError, RemoteOp, Result};
use crate::journal::PendingJournal;
use crate::sync::{commit_preview, CommitPreview, CommitReport, RemoteSyncCommitter};
use crate::upload::{next_file_number, prepare_upload, UploadFile, UploadPreviewCache};
use folio_fs::{is_reserved_slug, sanitize_slug};
use folio_store::{ContentStore, Credential, WriteOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct ActiveSession {
    snapshot: CatalogSnapshot,
    journal: PendingJournal,
    previews: UploadPreviewCache,
    /// Photos uploaded since `begin`, in upload order
    uploaded: Vec<Photo>,
    /// Lowest file number not known to be taken remotely
    next_number: u32,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the upload finishes or its future is dropped
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct EditSession {
    credential: Option<Credential>,
    active: Option<ActiveSession>,
    store_config: StoreConfig,
    upload_config: UploadConfig,
}

impl EditSession {
    pub fn new(store_config: StoreConfig, upload_config: UploadConfig) -> Self {
        Self {
            credential: None,
            active: None,
            store_config,
            upload_config,
        }
    }

    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// An upload is in flight
    pub fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.busy.load(Ordering::Acquire))
    }

    pub fn journal(&self) -> Option<&PendingJournal> {
        self.active.as_ref().map(|s| &s.journal)
    }

    /// Local preview for a thumbnail uploaded this session
    pub fn preview_for(&self, grid_path: &str) -> Option<&str> {
        self.active.as_ref()?.previews.get(grid_path)
    }

    pub fn begin(&mut self, catalog: &MediaCatalog) -> Result<()> {
        if self.credential.is_none() {
            return Err(FolioError::NoCredential);
        }
        if self.active.is_some() {
            return Err(FolioError::SessionActive);
        }

        self.active = Some(ActiveSession {
            snapshot: catalog.snapshot(),
            journal: PendingJournal::new(),
            previews: UploadPreviewCache::new(),
            uploaded: Vec::new(),
            next_number: 1,
            busy: Arc::new(AtomicBool::new(false)),
        });
        tracing::info!("Edit session started ({} photos)", catalog.photo_count());
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut ActiveSession> {
        self.active.as_mut().ok_or(FolioError::SessionInactive)
    }

    /// Move the photo at `from` so it ends up at `to` within the same album
    pub fn reorder(&mut self, catalog: &mut MediaCatalog, album: &str, from: usize, to: usize) -> Result<()> {
        self.session_mut()?;
        let photos = &mut catalog
            .album_mut(album)
            .ok_or_else(|| FolioError::AlbumNotFound(album.to_string()))?
            .photos;

        for index in [from, to] {
            if index >= photos.len() {
                return Err(FolioError::IndexOutOfRange {
                    album: album.to_string(),
                    index,
                    len: photos.len(),
                });
            }
        }

        let photo = photos.remove(from);
        photos.insert(to, photo);
        tracing::debug!("Reordered {}: {} -> {}", album, from, to);
        Ok(())
    }

    /// Append a photo to another album and journal the file move
    pub fn move_to_album(&mut self, catalog: &mut MediaCatalog, source_path: &str, target: &str) -> Result<()> {
        let Self { active, store_config, .. } = self;
        let session = active.as_mut().ok_or(FolioError::SessionInactive)?;
        let (current, index) = catalog
            .locate(source_path)
            .map(|(slug, index)| (slug.to_string(), index))
            .ok_or_else(|| FolioError::PhotoNotFound(source_path.to_string()))?;

        if !catalog.contains_album(target) {
            return Err(FolioError::AlbumNotFound(target.to_string()));
        }
        if current == target {
            return Ok(());
        }

        let photo = match catalog.album_mut(&current) {
            Some(album) => album.photos.remove(index),
            None => return Err(FolioError::AlbumNotFound(current)),
        };

        if !session.previews.is_uploaded(&photo.source_path) {
            let prefix = target_prefix(catalog, target, session, store_config);
            session.journal.record_move(photo.file_name(), photo.folder(), &prefix);
        }

        tracing::debug!("Moved {} from {} to {}", photo.source_path, current, target);
        if let Some(album) = catalog.album_mut(target) {
            album.photos.push(photo);
        }
        Ok(())
    }

    /// Create an empty album; returns its slug
    pub fn create_album(&mut self, catalog: &mut MediaCatalog, name: &str) -> Result<String> {
        self.session_mut()?;
        let slug = validate_new_slug(catalog, name)?;
        catalog.insert_album(slug.clone());
        tracing::info!("Created album {}", slug);
        Ok(slug)
    }

    /// Rename an album in place; returns the new slug
    pub fn rename_album(&mut self, catalog: &mut MediaCatalog, old: &str, new_name: &str) -> Result<String> {
        self.session_mut()?;
        if old == UNSORTED {
            return Err(FolioError::ReservedAlbumName(old.to_string()));
        }
        if !catalog.contains_album(old) {
            return Err(FolioError::AlbumNotFound(old.to_string()));
        }
        if sanitize_slug(new_name) == old {
            return Ok(old.to_string());
        }

        let slug = validate_new_slug(catalog, new_name)?;
        if let Some(album) = catalog.album_mut(old) {
            album.slug = slug.clone();
        }
        tracing::info!("Renamed album {} to {}", old, slug);
        Ok(slug)
    }

    /// Remove an album; its photos go to unsorted
    pub fn delete_album(&mut self, catalog: &mut MediaCatalog, slug: &str) -> Result<()> {
        let Self { active, store_config, .. } = self;
        let session = active.as_mut().ok_or(FolioError::SessionInactive)?;
        if slug == UNSORTED {
            return Err(FolioError::ReservedAlbumName(slug.to_string()));
        }
        let album = catalog
            .remove_album(slug)
            .ok_or_else(|| FolioError::AlbumNotFound(slug.to_string()))?;

        let prefix = target_prefix(catalog, UNSORTED, session, store_config);
        for photo in &album.photos {
            if !session.previews.is_uploaded(&photo.source_path) {
                session.journal.record_move(photo.file_name(), photo.folder(), &prefix);
            }
        }

        tracing::info!("Deleted album {} ({} photos to unsorted)", slug, album.photos.len());
        catalog.unsorted_mut().photos.extend(album.photos);
        Ok(())
    }

    /// Take a photo out of the catalog and stage its files for deletion
    pub fn stage_delete(&mut self, catalog: &mut MediaCatalog, source_path: &str) -> Result<Photo> {
        let session = self.session_mut()?;
        let (slug, index) = catalog
            .locate(source_path)
            .map(|(slug, index)| (slug.to_string(), index))
            .ok_or_else(|| FolioError::PhotoNotFound(source_path.to_string()))?;

        let photo = match catalog.album_mut(&slug) {
            Some(album) => album.photos.remove(index),
            None => return Err(FolioError::AlbumNotFound(slug)),
        };
        session.journal.record_delete(&photo);
        tracing::debug!("Staged delete of {}", photo.source_path);
        Ok(photo)
    }

    /// Discard local edits. Uploaded photos stay in the album they ended up
    /// in (unsorted if that album no longer exists or they were staged for
    /// deletion).
    pub fn cancel(&mut self, catalog: &mut MediaCatalog) -> Result<()> {
        let session = self.active.take().ok_or(FolioError::SessionInactive)?;

        let placements: Vec<(Photo, Option<String>)> = session
            .uploaded
            .into_iter()
            .map(|photo| {
                let slug = catalog.locate(&photo.source_path).map(|(slug, _)| slug.to_string());
                (photo, slug)
            })
            .collect();

        catalog.restore(session.snapshot);

        for (photo, slug) in placements {
            let target = slug
                .filter(|s| catalog.contains_album(s))
                .unwrap_or_else(|| UNSORTED.to_string());
            if let Some(album) = catalog.album_mut(&target) {
                album.photos.push(photo);
            }
        }

        tracing::info!("Edit session cancelled");
        Ok(())
    }

    /// Validate, write full image and thumbnail, then add the photo to unsorted
    pub async fn upload(
        &mut self,
        catalog: &mut MediaCatalog,
        store: &dyn ContentStore,
        file: UploadFile,
    ) -> Result<Photo> {
        let session = self.session_mut()?;
        if session.busy.swap(true, Ordering::AcqRel) {
            return Err(FolioError::Busy);
        }
        let _guard = BusyGuard(session.busy.clone());

        let number = next_file_number(catalog, &session.journal).max(session.next_number);
        let upload_config = self.upload_config.clone();
        let store_config = self.store_config.clone();
        let prepared = tokio::task::spawn_blocking(move || {
            prepare_upload(file, number, &upload_config, &store_config)
        })
        .await
        .map_err(|e| FolioError::Io(std::io::Error::other(e)))??;

        let photo = prepared.photo.clone();
        let message = format!("Upload {}", photo.file_name());
        // A full image left behind would make every later upload conflict
        // on the same number
        let mut left_behind = false;
        let mut result = write_new(store, &photo.source_path, &prepared.full, &message).await;
        if matches!(result, Err(FolioError::Conflict(_))) {
            left_behind = true;
        } else if result.is_ok() {
            result = write_new(store, &photo.grid_path, &prepared.grid, &message).await;
            if result.is_err() {
                left_behind = !remove_partial(store, &photo.source_path).await;
            }
        }

        if let Err(e) = result {
            if left_behind {
                self.session_mut()?.next_number = number + 1;
            }
            self.note_failure(&e);
            return Err(e);
        }

        let session = self.session_mut()?;
        session.next_number = number + 1;
        session.previews.insert(&photo, prepared.preview);
        session.uploaded.push(photo.clone());
        catalog.unsorted_mut().photos.push(photo.clone());

        tracing::info!("Uploaded {} ({}x{})", photo.source_path, photo.width, photo.height);
        Ok(photo)
    }

    /// Artifacts the next commit would write
    pub fn preview_commit(&self, catalog: &MediaCatalog) -> Result<CommitPreview> {
        let session = self.active.as_ref().ok_or(FolioError::SessionInactive)?;
        commit_preview(catalog, &session.journal)
    }

    /// Publish the session. On success the session ends; on failure it stays
    /// active with whatever is left of the journal.
    pub async fn commit(&mut self, catalog: &MediaCatalog, store: &dyn ContentStore) -> Result<CommitReport> {
        if self.is_busy() {
            return Err(FolioError::Busy);
        }
        let session = self.active.as_mut().ok_or(FolioError::SessionInactive)?;

        let result = RemoteSyncCommitter::new(store, &self.store_config)
            .commit(catalog, &mut session.journal)
            .await;

        match result {
            Ok(report) => {
                self.active = None;
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Commit failed: {}", e);
                self.note_failure(&e);
                Err(e)
            }
        }
    }

    fn note_failure(&mut self, err: &FolioError) {
        if err.is_unauthorized() {
            tracing::warn!("Credential rejected; discarding it");
            self.credential = None;
        }
    }
}

/// Folder photos of `target` live in: where its first remote photo lives
/// or is headed, else the album's default folder
fn target_prefix(catalog: &MediaCatalog, target: &str, session: &ActiveSession, config: &StoreConfig) -> String {
    let existing = catalog.album(target).and_then(|album| {
        album
            .photos
            .iter()
            .find(|p| !session.previews.is_uploaded(&p.source_path))
            .map(|p| match session.journal.pending_move(&p.source_path) {
                Some(entry) => entry.to.clone(),
                None => p.folder().to_string(),
            })
    });

    existing.unwrap_or_else(|| {
        if target == UNSORTED {
            config.photos_dir.clone()
        } else {
            format!("{}/{}", config.photos_dir, target)
        }
    })
}

fn validate_new_slug(catalog: &MediaCatalog, name: &str) -> Result<String> {
    let slug = sanitize_slug(name);
    if slug.is_empty() {
        return Err(FolioError::InvalidAlbumName(name.to_string()));
    }
    if is_reserved_slug(&slug) {
        return Err(FolioError::ReservedAlbumName(slug));
    }
    if catalog.contains_album(&slug) {
        return Err(FolioError::AlbumExists(slug));
    }
    Ok(slug)
}

/// Create a file that must not exist yet
async fn write_new(store: &dyn ContentStore, path: &str, content: &[u8], message: &str) -> Result<()> {
    let outcome = store
        .write(path, content, None, message)
        .await
        .map_err(|e| FolioError::remote(RemoteOp::Write(path.to_string()), e))?;

    match outcome {
        WriteOutcome::Written(_) => Ok(()),
        WriteOutcome::Conflict { .. } => Err(FolioError::Conflict(RemoteOp::Write(path.to_string()))),
    }
}

/// Best-effort removal of a half-finished upload; true when nothing remains
async fn remove_partial(store: &dyn ContentStore, path: &str) -> bool {
    match store.delete(path, &format!("Remove incomplete upload {}", path)).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Could not remove incomplete upload {}: {}", path, e);
            false
        }
    }
}
