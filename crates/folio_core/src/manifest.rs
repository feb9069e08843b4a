//! Persisted artifacts
//!
//! - `photos.json`: album slug -> ordered `{src, grid, w, h}` records, with
//!   unassigned photos under `_unsorted` (always last)
//! - `order.json`: album slug -> ordered filename stems
//! - `moves.json`: list of `{file, from, to}` folder relocations
//!
//! JSON objects here are ordered: album order is display order. serde_json's
//! `preserve_order` keeps document order when reading.

use crate::catalog::{Album, MediaCatalog, Photo, UNSORTED};
use crate::error::{FolioError, Result};
use crate::journal::MoveEntry;
use folio_fs::{is_valid_slug, ScannedAlbum};
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Manifest key of the unsorted pseudo-album
pub const UNSORTED_KEY: &str = "_unsorted";

/// JSON object that keeps its key order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: DeserializeOwned> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, value)| serde_json::from_value(value).map(|v| (key, v)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(OrderedMap)
            .map_err(D::Error::custom)
    }
}

/// One photo record in `photos.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub src: String,
    pub grid: String,
    pub w: u32,
    pub h: u32,
}

impl From<&Photo> for ManifestEntry {
    fn from(photo: &Photo) -> Self {
        Self {
            src: photo.source_path.clone(),
            grid: photo.grid_path.clone(),
            w: photo.width,
            h: photo.height,
        }
    }
}

impl From<ManifestEntry> for Photo {
    fn from(entry: ManifestEntry) -> Self {
        Photo::new(entry.src, entry.grid, entry.w, entry.h)
    }
}

/// `photos.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoManifest(pub OrderedMap<Vec<ManifestEntry>>);

impl PhotoManifest {
    pub fn from_catalog(catalog: &MediaCatalog) -> Self {
        let albums = catalog
            .albums()
            .iter()
            .map(|album| {
                let key = if album.is_unsorted() {
                    UNSORTED_KEY.to_string()
                } else {
                    album.slug.clone()
                };
                (key, album.photos.iter().map(ManifestEntry::from).collect())
            })
            .collect();
        Self(OrderedMap(albums))
    }

    /// Build from a scanned photo tree
    pub fn from_scan(albums: Vec<ScannedAlbum>) -> Self {
        let mut entries: Vec<(String, Vec<ManifestEntry>)> = Vec::with_capacity(albums.len() + 1);
        let mut unsorted = Vec::new();

        for album in albums {
            let photos = album.photos.into_iter().map(|p| ManifestEntry {
                src: p.src,
                grid: p.grid,
                w: p.width,
                h: p.height,
            });
            if album.slug == UNSORTED {
                unsorted.extend(photos);
            } else {
                entries.push((album.slug, photos.collect()));
            }
        }

        entries.push((UNSORTED_KEY.to_string(), unsorted));
        Self(OrderedMap(entries))
    }

    /// Validate and convert into a catalog
    pub fn into_catalog(self) -> Result<MediaCatalog> {
        let mut seen = HashSet::new();
        let mut albums = Vec::with_capacity(self.0.len() + 1);
        let mut slugs = HashSet::new();

        for (key, entries) in self.0 .0 {
            let slug = if key == UNSORTED_KEY {
                UNSORTED.to_string()
            } else if is_valid_slug(&key) {
                key
            } else {
                return Err(FolioError::Manifest(format!("invalid album key {:?}", key)));
            };

            if !slugs.insert(slug.clone()) {
                return Err(FolioError::Manifest(format!("album {} listed twice", slug)));
            }

            let mut album = Album::new(slug);
            for entry in entries {
                if !seen.insert(entry.src.clone()) {
                    return Err(FolioError::Manifest(format!("photo {} listed twice", entry.src)));
                }
                album.photos.push(entry.into());
            }
            albums.push(album);
        }

        Ok(MediaCatalog::from_albums(albums))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<Vec<u8>> {
        to_pretty_json(self)
    }

    pub fn albums(&self) -> &OrderedMap<Vec<ManifestEntry>> {
        &self.0
    }
}

/// `order.json`: visible albums only, filename stems in display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderIndex(pub OrderedMap<Vec<String>>);

impl OrderIndex {
    pub fn from_catalog(catalog: &MediaCatalog) -> Self {
        let albums = catalog
            .visible_albums()
            .map(|album| {
                let stems = album.photos.iter().map(|p| p.stem().to_string()).collect();
                (album.slug.clone(), stems)
            })
            .collect();
        Self(OrderedMap(albums))
    }

    pub fn from_manifest(manifest: &PhotoManifest) -> Self {
        let albums = manifest
            .albums()
            .0
            .iter()
            .filter(|(key, _)| key != UNSORTED_KEY)
            .map(|(key, entries)| {
                let stems = entries
                    .iter()
                    .map(|e| Photo::from(e.clone()).stem().to_string())
                    .collect();
                (key.clone(), stems)
            })
            .collect();
        Self(OrderedMap(albums))
    }

    pub fn get(&self, slug: &str) -> Option<&Vec<String>> {
        self.0.get(slug)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        to_pretty_json(self)
    }
}

/// `moves.json`
pub fn decode_moves(bytes: &[u8]) -> Result<Vec<MoveEntry>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode_moves(moves: &[MoveEntry]) -> Result<Vec<u8>> {
    to_pretty_json(&moves)
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_fs::ScannedPhoto;

    const SAMPLE: &str = r#"{
  "zebra": [
    { "src": "photos/zebra/002.jpg", "grid": "photos/zebra/grid/002.jpg", "w": 1200, "h": 800 },
    { "src": "photos/zebra/001.jpg", "grid": "photos/zebra/grid/001.jpg", "w": 800, "h": 1200 }
  ],
  "apple": [],
  "_unsorted": [
    { "src": "photos/010.jpg", "grid": "photos/grid/010.jpg", "w": 640, "h": 480 }
  ]
}"#;

    #[test]
    fn test_manifest_keeps_album_order() {
        let manifest = PhotoManifest::from_json(SAMPLE.as_bytes()).unwrap();
        let keys: Vec<_> = manifest.albums().keys().collect();
        assert_eq!(keys, ["zebra", "apple", UNSORTED_KEY]);

        let catalog = manifest.clone().into_catalog().unwrap();
        assert_eq!(catalog.albums()[0].slug, "zebra");
        assert_eq!(catalog.album("zebra").unwrap().photos[0].stem(), "002");
        assert_eq!(catalog.unsorted().photos.len(), 1);

        let written = PhotoManifest::from_catalog(&catalog);
        assert_eq!(written, manifest);
        let text = String::from_utf8(written.to_json().unwrap()).unwrap();
        assert!(text.find("\"zebra\"").unwrap() < text.find("\"apple\"").unwrap());
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_unsorted_written_last() {
        let manifest = PhotoManifest::from_json(br#"{"_unsorted": [], "b": []}"#).unwrap();
        let catalog = manifest.into_catalog().unwrap();
        let keys: Vec<_> = PhotoManifest::from_catalog(&catalog).albums().keys().map(String::from).collect();
        assert_eq!(keys, ["b", UNSORTED_KEY]);
    }

    #[test]
    fn test_rejects_bad_manifests() {
        let err = PhotoManifest::from_json(br#"{"Bad Key": []}"#).unwrap().into_catalog();
        assert!(matches!(err, Err(FolioError::Manifest(_))));

        let err = PhotoManifest::from_json(br#"{"grid": []}"#).unwrap().into_catalog();
        assert!(matches!(err, Err(FolioError::Manifest(_))));

        let dup = br#"{
            "a": [{"src": "x.jpg", "grid": "x.jpg", "w": 1, "h": 1}],
            "b": [{"src": "x.jpg", "grid": "x.jpg", "w": 1, "h": 1}]
        }"#;
        let err = PhotoManifest::from_json(dup).unwrap().into_catalog();
        assert!(matches!(err, Err(FolioError::Manifest(_))));

        assert!(PhotoManifest::from_json(b"[1, 2]").is_err());
        assert!(PhotoManifest::from_json(br#"{"a": [{"src": 1}]}"#).is_err());
    }

    #[test]
    fn test_order_index() {
        let manifest = PhotoManifest::from_json(SAMPLE.as_bytes()).unwrap();
        let order = OrderIndex::from_manifest(&manifest);
        assert_eq!(order.get("zebra").unwrap(), &["002", "001"]);
        assert_eq!(order.get("apple").unwrap().len(), 0);
        assert!(order.get(UNSORTED_KEY).is_none());

        let catalog = manifest.into_catalog().unwrap();
        assert_eq!(OrderIndex::from_catalog(&catalog), order);
    }

    #[test]
    fn test_from_scan() {
        let scanned = vec![
            ScannedAlbum {
                slug: "trips".into(),
                photos: vec![ScannedPhoto {
                    src: "photos/trips/1.jpg".into(),
                    grid: "photos/trips/grid/1.jpg".into(),
                    width: 300,
                    height: 200,
                }],
            },
            ScannedAlbum {
                slug: UNSORTED.into(),
                photos: Vec::new(),
            },
        ];
        let manifest = PhotoManifest::from_scan(scanned);
        let keys: Vec<_> = manifest.albums().keys().collect();
        assert_eq!(keys, ["trips", UNSORTED_KEY]);
        assert_eq!(manifest.albums().get("trips").unwrap()[0].w, 300);
    }

    #[test]
    fn test_moves_codec() {
        assert!(decode_moves(b"").unwrap().is_empty());
        let moves = vec![MoveEntry::new("001.jpg", "photos/a", "photos/b")];
        let bytes = encode_moves(&moves).unwrap();
        assert_eq!(decode_moves(&bytes).unwrap(), moves);
    }
}
