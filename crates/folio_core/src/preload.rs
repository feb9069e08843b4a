//! Decoded-image cache around the current slide

use crate::catalog::Photo;
use std::collections::BTreeMap;

/// Produces decoded-image handles for photos
pub trait ImageLoader {
    type Handle: Clone;

    /// Start (or perform) loading the image at `path`
    fn load(&mut self, path: &str) -> Self::Handle;
}

/// Handles keyed by logical photo index.
///
/// Entries within the preload radius of the current index are loaded; entries
/// beyond the eviction radius are dropped. The gap between the two radii
/// keeps a just-left neighbour warm when the user turns back.
#[derive(Debug, Clone)]
pub struct PreloadCache<H> {
    entries: BTreeMap<usize, H>,
    preload_radius: usize,
    evict_radius: usize,
}

impl<H: Clone> PreloadCache<H> {
    pub fn new(preload_radius: usize, evict_radius: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            preload_radius,
            evict_radius: evict_radius.max(preload_radius),
        }
    }

    pub fn get(&self, index: usize) -> Option<&H> {
        self.entries.get(&index)
    }

    /// Handle for `index`, loading it when missing
    pub fn get_or_load<L>(&mut self, index: usize, photos: &[Photo], loader: &mut L) -> Option<H>
    where
        L: ImageLoader<Handle = H>,
    {
        if let Some(handle) = self.entries.get(&index) {
            return Some(handle.clone());
        }
        let photo = photos.get(index)?;
        let handle = loader.load(&photo.source_path);
        self.entries.insert(index, handle.clone());
        Some(handle)
    }

    /// Load everything within the preload radius of `center`, then evict
    pub fn refresh<L>(&mut self, center: usize, photos: &[Photo], loader: &mut L)
    where
        L: ImageLoader<Handle = H>,
    {
        let start = center.saturating_sub(self.preload_radius);
        let end = (center + self.preload_radius).min(photos.len().saturating_sub(1));
        for index in start..=end {
            self.get_or_load(index, photos, loader);
        }
        self.evict_around(center);
    }

    pub fn evict_around(&mut self, center: usize) {
        let radius = self.evict_radius;
        let before = self.entries.len();
        self.entries.retain(|&index, _| index.abs_diff(center) <= radius);

        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} cached images around {}", evicted, center);
        }
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every load; the handle is the path
    #[derive(Debug, Default)]
    pub(crate) struct RecordingLoader {
        pub loads: Vec<String>,
    }

    impl ImageLoader for RecordingLoader {
        type Handle = String;

        fn load(&mut self, path: &str) -> String {
            self.loads.push(path.to_string());
            path.to_string()
        }
    }

    pub(crate) fn photos(count: usize) -> Vec<Photo> {
        (0..count)
            .map(|i| Photo::new(format!("p/{}.jpg", i), format!("p/grid/{}.jpg", i), 1200, 800))
            .collect()
    }

    #[test]
    fn test_refresh_window() {
        let photos = photos(10);
        let mut loader = RecordingLoader::default();
        let mut cache = PreloadCache::new(2, 3);

        cache.refresh(0, &photos, &mut loader);
        assert_eq!(cache.indices(), [0, 1, 2]);

        cache.refresh(3, &photos, &mut loader);
        assert_eq!(cache.indices(), [0, 1, 2, 3, 4, 5]);
        // 0..=2 were not loaded twice
        assert_eq!(loader.loads.len(), 6);

        cache.refresh(5, &photos, &mut loader);
        assert_eq!(cache.indices(), [2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_refresh_clamps_to_album() {
        let photos = photos(2);
        let mut loader = RecordingLoader::default();
        let mut cache = PreloadCache::new(2, 3);
        cache.refresh(1, &photos, &mut loader);
        assert_eq!(cache.indices(), [0, 1]);

        let mut empty = PreloadCache::<String>::new(2, 3);
        empty.refresh(0, &[], &mut loader);
        assert!(empty.is_empty());
    }
}
