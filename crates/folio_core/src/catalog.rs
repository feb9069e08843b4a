//! Album and photo catalog
//!
//! The single source of truth the grid, the viewer and the edit session all
//! render from. Every photo lives in exactly one album; the `unsorted`
//! pseudo-album always exists and is always last.

use folio_fs::UNSORTED_FOLDER;
use serde::{Deserialize, Serialize};

/// Catalog key of the pseudo-album holding unassigned photos
pub const UNSORTED: &str = UNSORTED_FOLDER;

/// One photo; identity is `source_path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub source_path: String,
    pub grid_path: String,
    pub width: u32,
    pub height: u32,
}

impl Photo {
    pub fn new(source_path: impl Into<String>, grid_path: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            source_path: source_path.into(),
            grid_path: grid_path.into(),
            width,
            height,
        }
    }

    /// Filename including extension (`003.jpg`)
    pub fn file_name(&self) -> &str {
        self.source_path
            .rsplit_once('/')
            .map_or(self.source_path.as_str(), |(_, name)| name)
    }

    /// Filename without extension (`003`)
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }

    /// Folder the source file lives in (`photos/trips`)
    pub fn folder(&self) -> &str {
        self.source_path
            .rsplit_once('/')
            .map_or("", |(folder, _)| folder)
    }

    /// Width / height
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Ordered photos under one slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub slug: String,
    pub photos: Vec<Photo>,
}

impl Album {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            photos: Vec::new(),
        }
    }

    pub fn is_unsorted(&self) -> bool {
        self.slug == UNSORTED
    }

    pub fn position_of(&self, source_path: &str) -> Option<usize> {
        self.photos.iter().position(|p| p.source_path == source_path)
    }
}

/// Deep copy of every album, taken when an edit session begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    albums: Vec<Album>,
}

impl CatalogSnapshot {
    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn contains_photo(&self, source_path: &str) -> bool {
        self.albums
            .iter()
            .any(|a| a.position_of(source_path).is_some())
    }
}

/// In-memory albums in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCatalog {
    albums: Vec<Album>,
}

impl Default for MediaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaCatalog {
    /// Empty catalog with only the unsorted pseudo-album
    pub fn new() -> Self {
        Self {
            albums: vec![Album::new(UNSORTED)],
        }
    }

    /// Build from albums in display order; unsorted is moved (or added) last
    pub fn from_albums(albums: Vec<Album>) -> Self {
        let mut catalog = Self { albums };
        catalog.normalize_unsorted();
        catalog
    }

    fn normalize_unsorted(&mut self) {
        let mut unsorted = Album::new(UNSORTED);
        self.albums.retain_mut(|album| {
            if album.is_unsorted() {
                unsorted.photos.append(&mut album.photos);
                false
            } else {
                true
            }
        });
        self.albums.push(unsorted);
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    /// Visible albums (everything but unsorted)
    pub fn visible_albums(&self) -> impl Iterator<Item = &Album> {
        self.albums.iter().filter(|a| !a.is_unsorted())
    }

    pub fn album(&self, slug: &str) -> Option<&Album> {
        self.albums.iter().find(|a| a.slug == slug)
    }

    pub fn album_mut(&mut self, slug: &str) -> Option<&mut Album> {
        self.albums.iter_mut().find(|a| a.slug == slug)
    }

    pub fn contains_album(&self, slug: &str) -> bool {
        self.album(slug).is_some()
    }

    pub fn unsorted(&self) -> &Album {
        // normalize_unsorted keeps it last
        &self.albums[self.albums.len() - 1]
    }

    pub fn unsorted_mut(&mut self) -> &mut Album {
        let last = self.albums.len() - 1;
        &mut self.albums[last]
    }

    /// Find a photo: (album slug, index in album)
    pub fn locate(&self, source_path: &str) -> Option<(&str, usize)> {
        self.albums.iter().find_map(|album| {
            album
                .position_of(source_path)
                .map(|index| (album.slug.as_str(), index))
        })
    }

    pub fn photo(&self, source_path: &str) -> Option<&Photo> {
        let (slug, index) = self.locate(source_path)?;
        self.album(slug).map(|a| &a.photos[index])
    }

    pub fn photos(&self) -> impl Iterator<Item = &Photo> {
        self.albums.iter().flat_map(|a| a.photos.iter())
    }

    pub fn photo_count(&self) -> usize {
        self.albums.iter().map(|a| a.photos.len()).sum()
    }

    /// Add an empty album just before unsorted. Caller validates the slug.
    pub fn insert_album(&mut self, slug: impl Into<String>) {
        let at = self.albums.len() - 1;
        self.albums.insert(at, Album::new(slug));
    }

    /// Remove a visible album and return it
    pub fn remove_album(&mut self, slug: &str) -> Option<Album> {
        if slug == UNSORTED {
            return None;
        }
        let index = self.albums.iter().position(|a| a.slug == slug)?;
        Some(self.albums.remove(index))
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            albums: self.albums.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: CatalogSnapshot) {
        self.albums = snapshot.albums;
        self.normalize_unsorted();
    }

    /// Source paths listed more than once (always empty for a healthy catalog)
    pub fn duplicate_sources(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.photos()
            .filter(|p| !seen.insert(p.source_path.as_str()))
            .map(|p| p.source_path.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(src: &str) -> Photo {
        Photo::new(src, src.replace("/0", "/grid/0"), 1200, 800)
    }

    fn sample() -> MediaCatalog {
        MediaCatalog::from_albums(vec![
            Album {
                slug: UNSORTED.into(),
                photos: vec![photo("photos/009.jpg")],
            },
            Album {
                slug: "trips".into(),
                photos: vec![photo("photos/trips/001.jpg"), photo("photos/trips/002.jpg")],
            },
        ])
    }

    #[test]
    fn test_unsorted_always_last() {
        let catalog = sample();
        assert_eq!(catalog.albums().len(), 2);
        assert_eq!(catalog.albums()[0].slug, "trips");
        assert!(catalog.unsorted().is_unsorted());

        let mut catalog = MediaCatalog::new();
        catalog.insert_album("a");
        catalog.insert_album("b");
        let slugs: Vec<_> = catalog.albums().iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, ["a", "b", UNSORTED]);
        assert!(catalog.remove_album(UNSORTED).is_none());
    }

    #[test]
    fn test_photo_paths() {
        let p = photo("photos/trips/001.jpg");
        assert_eq!(p.file_name(), "001.jpg");
        assert_eq!(p.stem(), "001");
        assert_eq!(p.folder(), "photos/trips");
        assert_eq!(Photo::new("a.png", "a.png", 1, 1).folder(), "");
        assert!((p.aspect_ratio() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_locate() {
        let catalog = sample();
        assert_eq!(catalog.locate("photos/trips/002.jpg"), Some(("trips", 1)));
        assert_eq!(catalog.locate("photos/009.jpg"), Some((UNSORTED, 0)));
        assert_eq!(catalog.locate("nope.jpg"), None);
        assert_eq!(catalog.photo_count(), 3);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut catalog = sample();
        let snapshot = catalog.snapshot();

        catalog.album_mut("trips").unwrap().photos.clear();
        catalog.album_mut("trips").unwrap().slug = "renamed".into();
        assert_eq!(snapshot.albums()[0].photos.len(), 2);
        assert_eq!(snapshot.albums()[0].slug, "trips");

        catalog.restore(snapshot);
        assert_eq!(catalog, sample());
        assert!(catalog.duplicate_sources().is_empty());
    }
}
