//! Gallery state: the catalog plus the edit session that mutates it

use crate::catalog::{MediaCatalog, Photo};
use crate::error::{FolioError, RemoteOp, Result};
use crate::geometry::{Rect, Vec2};
use crate::layout::GridLayout;
use crate::manifest::PhotoManifest;
use crate::overlay::{OverlayHost, TransientOverlay};
use crate::session::EditSession;
use crate::sync::{CommitPreview, CommitReport};
use crate::upload::UploadFile;
use crate::FolioConfig;
use folio_store::{ContentStore, Credential};

/// A thumbnail being dragged within its album
#[derive(Debug)]
struct DragState {
    album: String,
    from: usize,
    over: usize,
    /// Pointer position relative to the thumbnail's top-left corner
    grab: Vec2,
    overlay: TransientOverlay,
}

pub struct GalleryState {
    config: FolioConfig,
    catalog: MediaCatalog,
    session: EditSession,
    drag: Option<DragState>,
}

impl GalleryState {
    pub fn new(config: FolioConfig, catalog: MediaCatalog) -> Self {
        let session = EditSession::new(config.store.clone(), config.upload.clone());
        Self {
            config,
            catalog,
            session,
            drag: None,
        }
    }

    /// Load the published manifest; a missing one yields an empty catalog
    pub async fn load(config: FolioConfig, store: &dyn ContentStore) -> Result<Self> {
        let path = config.store.manifest_path.clone();
        let catalog = match store
            .fetch(&path)
            .await
            .map_err(|e| FolioError::remote(RemoteOp::Fetch(path.clone()), e))?
        {
            Some(file) => PhotoManifest::from_json(&file.content)?.into_catalog()?,
            None => {
                tracing::warn!("No manifest at {}; starting empty", path);
                MediaCatalog::new()
            }
        };

        tracing::info!(
            "Loaded {} photos in {} albums",
            catalog.photo_count(),
            catalog.visible_albums().count()
        );
        Ok(Self::new(config, catalog))
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    pub fn catalog(&self) -> &MediaCatalog {
        &self.catalog
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.session.set_credential(credential);
    }

    pub fn is_editing(&self) -> bool {
        self.session.is_active()
    }

    /// Image to draw for a thumbnail: the local preview if one exists
    pub fn thumbnail_source<'a>(&'a self, photo: &'a Photo) -> &'a str {
        self.session
            .preview_for(&photo.grid_path)
            .unwrap_or(&photo.grid_path)
    }

    // ===== Session lifecycle =====

    pub fn begin_edit(&mut self) -> Result<()> {
        self.session.begin(&self.catalog)
    }

    pub fn cancel_edit(&mut self) -> Result<()> {
        self.cancel_drag();
        self.session.cancel(&mut self.catalog)
    }

    pub fn preview_commit(&self) -> Result<CommitPreview> {
        self.session.preview_commit(&self.catalog)
    }

    pub async fn commit(&mut self, store: &dyn ContentStore) -> Result<CommitReport> {
        let report = self.session.commit(&self.catalog, store).await?;
        self.cancel_drag();
        Ok(report)
    }

    pub async fn upload(&mut self, store: &dyn ContentStore, file: UploadFile) -> Result<Photo> {
        self.session.upload(&mut self.catalog, store, file).await
    }

    // ===== Catalog edits =====

    pub fn reorder(&mut self, album: &str, from: usize, to: usize) -> Result<()> {
        self.session.reorder(&mut self.catalog, album, from, to)
    }

    pub fn move_to_album(&mut self, source_path: &str, target: &str) -> Result<()> {
        self.session.move_to_album(&mut self.catalog, source_path, target)
    }

    pub fn create_album(&mut self, name: &str) -> Result<String> {
        self.session.create_album(&mut self.catalog, name)
    }

    pub fn rename_album(&mut self, old: &str, new_name: &str) -> Result<String> {
        self.session.rename_album(&mut self.catalog, old, new_name)
    }

    pub fn delete_album(&mut self, slug: &str) -> Result<()> {
        self.session.delete_album(&mut self.catalog, slug)
    }

    pub fn stage_delete(&mut self, source_path: &str) -> Result<Photo> {
        self.session.stage_delete(&mut self.catalog, source_path)
    }

    // ===== Drag reorder =====

    /// Pick up the thumbnail under `pointer`; a clone follows the pointer
    pub fn begin_drag(
        &mut self,
        host: &mut dyn OverlayHost,
        album: &str,
        layout: &GridLayout,
        pointer: Vec2,
        scroll_y: f32,
    ) -> Result<bool> {
        if !self.session.is_active() {
            return Err(FolioError::SessionInactive);
        }
        self.cancel_drag();

        let Some(index) = layout.hit_test(pointer, scroll_y) else {
            return Ok(false);
        };
        let Some(rect) = layout.rect_of(index, scroll_y) else {
            return Ok(false);
        };
        let photo = self
            .catalog
            .album(album)
            .and_then(|a| a.photos.get(index))
            .ok_or_else(|| FolioError::AlbumNotFound(album.to_string()))?;

        let overlay = TransientOverlay::acquire(host, "drag", self.thumbnail_source(photo), rect);
        tracing::debug!("Drag started on {}[{}]", album, index);
        self.drag = Some(DragState {
            album: album.to_string(),
            from: index,
            over: index,
            grab: pointer - Vec2::new(rect.x, rect.y),
            overlay,
        });
        Ok(true)
    }

    /// Follow the pointer; returns the index the photo would drop at
    pub fn drag_over(&mut self, layout: &GridLayout, pointer: Vec2, scroll_y: f32) -> Option<usize> {
        let drag = self.drag.as_mut()?;
        let rect = drag.overlay.rect();
        drag.overlay.set_rect(Rect::new(
            pointer.x - drag.grab.x,
            pointer.y - drag.grab.y,
            rect.width,
            rect.height,
        ));

        if let Some(index) = layout.hit_test(pointer, scroll_y) {
            drag.over = index;
        }
        Some(drag.over)
    }

    /// Release the drag; returns `(from, to)` when a reorder happened
    pub fn drop_drag(&mut self) -> Result<Option<(usize, usize)>> {
        let Some(mut drag) = self.drag.take() else {
            return Ok(None);
        };
        drag.overlay.dispose();

        if drag.from == drag.over {
            return Ok(None);
        }
        self.move_photo_to_index(&drag.album, drag.from, drag.over)?;
        Ok(Some((drag.from, drag.over)))
    }

    pub fn cancel_drag(&mut self) {
        if let Some(mut drag) = self.drag.take() {
            drag.overlay.dispose();
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn move_photo_to_index(&mut self, album: &str, from: usize, to: usize) -> Result<()> {
        self.reorder(album, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Album;
    use crate::overlay::tests::RecordingHost;
    use folio_store::{FailureMode, MemoryStore};

    fn photos(album: &str, count: usize) -> Vec<Photo> {
        (1..=count)
            .map(|i| {
                Photo::new(
                    format!("photos/{}/{:03}.jpg", album, i),
                    format!("photos/{}/grid/{:03}.jpg", album, i),
                    1000,
                    1000,
                )
            })
            .collect()
    }

    fn gallery() -> GalleryState {
        let catalog = MediaCatalog::from_albums(vec![Album {
            slug: "trips".into(),
            photos: photos("trips", 6),
        }]);
        let mut state = GalleryState::new(FolioConfig::default(), catalog);
        state.set_credential(Credential::new("token"));
        state
    }

    fn stems(state: &GalleryState) -> Vec<&str> {
        state.catalog().album("trips").unwrap().photos.iter().map(|p| p.stem()).collect()
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let store = MemoryStore::new();
        let state = GalleryState::load(FolioConfig::default(), &store).await.unwrap();
        assert_eq!(state.catalog(), &MediaCatalog::new());

        let manifest = PhotoManifest::from_catalog(gallery().catalog()).to_json().unwrap();
        store.insert("photos.json", manifest);
        let state = GalleryState::load(FolioConfig::default(), &store).await.unwrap();
        assert_eq!(state.catalog(), gallery().catalog());

        store.fail_on("photos.json", FailureMode::ServerError);
        let err = GalleryState::load(FolioConfig::default(), &store).await.err().unwrap();
        assert!(err.is_remote());
    }

    #[test]
    fn test_drag_reorders() {
        let mut state = gallery();
        let mut host = RecordingHost::default();
        // 1000px wide: four square photos in the first row
        let layout = GridLayout::new(&state.catalog().album("trips").unwrap().photos, 1000.0);

        assert!(matches!(
            state.begin_drag(&mut host, "trips", &layout, Vec2::new(10.0, 10.0), 0.0),
            Err(FolioError::SessionInactive)
        ));

        state.begin_edit().unwrap();
        let start = layout.rect_of(0, 0.0).unwrap().center();
        assert!(state.begin_drag(&mut host, "trips", &layout, start, 0.0).unwrap());
        assert_eq!(host.live_count(), 1);

        let target = layout.rect_of(4, 0.0).unwrap().center();
        assert_eq!(state.drag_over(&layout, target, 0.0), Some(4));
        // Leaving the grid keeps the last target
        assert_eq!(state.drag_over(&layout, Vec2::new(5000.0, 5000.0), 0.0), Some(4));

        assert_eq!(state.drop_drag().unwrap(), Some((0, 4)));
        assert_eq!(host.live_count(), 0);
        assert_eq!(stems(&state), ["002", "003", "004", "005", "001", "006"]);
    }

    #[test]
    fn test_drag_disposed_on_cancel() {
        let mut state = gallery();
        let mut host = RecordingHost::default();
        let layout = GridLayout::new(&state.catalog().album("trips").unwrap().photos, 1000.0);
        state.begin_edit().unwrap();

        let start = layout.rect_of(1, 0.0).unwrap().center();
        assert!(state.begin_drag(&mut host, "trips", &layout, start, 0.0).unwrap());
        assert!(!state
            .begin_drag(&mut host, "trips", &layout, Vec2::new(-10.0, -10.0), 0.0)
            .unwrap());
        // Starting a new drag dropped the old clone
        assert_eq!(host.live_count(), 0);

        assert!(state.begin_drag(&mut host, "trips", &layout, start, 0.0).unwrap());
        state.cancel_edit().unwrap();
        assert!(!state.is_dragging());
        assert_eq!(host.live_count(), 0);
        assert_eq!(state.drop_drag().unwrap(), None);
    }

    #[test]
    fn test_drop_in_place_is_noop() {
        let mut state = gallery();
        let mut host = RecordingHost::default();
        let layout = GridLayout::new(&state.catalog().album("trips").unwrap().photos, 1000.0);
        state.begin_edit().unwrap();

        let start = layout.rect_of(2, 0.0).unwrap().center();
        state.begin_drag(&mut host, "trips", &layout, start, 0.0).unwrap();
        assert_eq!(state.drop_drag().unwrap(), None);
        assert_eq!(stems(&state), ["001", "002", "003", "004", "005", "006"]);
    }

    #[tokio::test]
    async fn test_commit_after_edits() {
        let store = MemoryStore::new();
        let mut state = gallery();
        state.begin_edit().unwrap();
        state.create_album("Family").unwrap();
        state.move_to_album("photos/trips/003.jpg", "family").unwrap();
        state.stage_delete("photos/trips/006.jpg").unwrap();

        let preview = state.preview_commit().unwrap();
        assert!(preview.moves.is_some());
        assert_eq!(preview.deletes.len(), 2);

        let report = state.commit(&store).await.unwrap();
        assert!(!state.is_editing());
        assert_eq!(report.moves_written, 1);
        assert_eq!(report.files_deleted, 2);

        let reloaded = GalleryState::load(FolioConfig::default(), &store).await.unwrap();
        assert_eq!(reloaded.catalog(), state.catalog());
    }
}
