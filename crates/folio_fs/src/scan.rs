//! Photo tree scanning
//!
//! Walks `<root>/<album>/*.jpg` style trees and produces the album listing the
//! initial manifest is built from. Root-level images are unassigned, and
//! `grid/` folders hold the thumbnails matching their parent's images.

use crate::{natural_cmp, sanitize_slug, is_reserved_slug, FsError, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Folder key used for images directly under the scan root
pub const UNSORTED_FOLDER: &str = "unsorted";

/// Thumbnail folder name inside every album folder
const GRID_FOLDER: &str = "grid";

/// Scan options
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lowercase extensions (without dot) accepted as photos
    pub extensions: Vec<String>,
    /// Filename stems never treated as photos (e.g. the page signature)
    pub excluded_stems: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into(), "webp".into()],
            excluded_stems: vec!["signature".into()],
        }
    }
}

/// One photo discovered on disk; paths are relative to the root's parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedPhoto {
    pub src: String,
    pub grid: String,
    pub width: u32,
    pub height: u32,
}

/// One album folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedAlbum {
    pub slug: String,
    pub photos: Vec<ScannedPhoto>,
}

/// Scan a photo tree.
///
/// Albums come back in natural folder order with the unsorted pseudo-album
/// last (present only when root-level images exist).
pub fn scan_photo_tree<P: AsRef<Path>>(root: P, options: &ScanOptions) -> Result<Vec<ScannedAlbum>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(FsError::NotFound(root.display().to_string()));
    }

    let prefix = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| FsError::InvalidPath(root.display().to_string()))?;

    let mut folders: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name == GRID_FOLDER || name.starts_with('.') {
            continue;
        }
        folders.push((name, entry.path()));
    }
    folders.sort_by(|a, b| natural_cmp(&a.0, &b.0));

    let mut albums = Vec::new();
    for (name, path) in folders {
        let slug = sanitize_slug(&name);
        if slug.is_empty() || is_reserved_slug(&slug) || slug != name {
            tracing::warn!("Skipping folder {:?}: not a valid album key", name);
            continue;
        }

        let photos = scan_folder(&path, &format!("{}/{}", prefix, name), options)?;
        tracing::debug!("Scanned album {} ({} photos)", slug, photos.len());
        albums.push(ScannedAlbum { slug, photos });
    }

    let loose = scan_folder(root, &prefix, options)?;
    if !loose.is_empty() {
        albums.push(ScannedAlbum {
            slug: UNSORTED_FOLDER.to_string(),
            photos: loose,
        });
    }

    tracing::info!("Scanned {} albums under {:?}", albums.len(), root);
    Ok(albums)
}

/// Scan the images of one folder; `rel` is the folder's path in the manifest
fn scan_folder(dir: &Path, rel: &str, options: &ScanOptions) -> Result<Vec<ScannedPhoto>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if is_photo(&name, options) {
            names.push(name);
        }
    }
    names.sort_by(|a, b| natural_cmp(a, b));

    let grid_dir = dir.join(GRID_FOLDER);

    // Header reads are independent; order is restored by collect()
    names
        .par_iter()
        .map(|name| {
            let path = dir.join(name);
            let (width, height) = image::image_dimensions(&path).map_err(|e| FsError::Image {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            let src = format!("{}/{}", rel, name);
            let grid = if grid_dir.join(name).is_file() {
                format!("{}/{}/{}", rel, GRID_FOLDER, name)
            } else {
                src.clone()
            };

            Ok(ScannedPhoto { src, grid, width, height })
        })
        .collect()
}

fn is_photo(name: &str, options: &ScanOptions) -> bool {
    let path = Path::new(name);
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_lowercase(),
        None => return false,
    };
    if !options.extensions.iter().any(|e| *e == ext) {
        return false;
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();
    !options.excluded_stems.iter().any(|s| *s == stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::new(width, height);
        img.save(path).unwrap();
    }

    #[test]
    fn test_scan_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(root.join("trips/grid")).unwrap();
        fs::create_dir_all(root.join("city")).unwrap();

        write_png(&root.join("trips/10.png"), 4, 3);
        write_png(&root.join("trips/2.png"), 3, 4);
        write_png(&root.join("trips/grid/2.png"), 3, 4);
        write_png(&root.join("city/a.png"), 2, 2);
        write_png(&root.join("loose.png"), 5, 1);
        write_png(&root.join("signature.png"), 1, 1);
        fs::write(root.join("notes.txt"), b"not a photo").unwrap();

        let albums = scan_photo_tree(&root, &ScanOptions::default()).unwrap();
        let slugs: Vec<_> = albums.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, vec!["city", "trips", "unsorted"]);

        let trips = &albums[1];
        assert_eq!(trips.photos[0].src, "photos/trips/2.png");
        assert_eq!(trips.photos[0].grid, "photos/trips/grid/2.png");
        assert_eq!((trips.photos[0].width, trips.photos[0].height), (3, 4));
        assert_eq!(trips.photos[1].src, "photos/trips/10.png");
        assert_eq!(trips.photos[1].grid, "photos/trips/10.png");

        assert_eq!(albums[2].photos.len(), 1);
        assert_eq!(albums[2].photos[0].src, "photos/loose.png");
    }

    #[test]
    fn test_scan_skips_invalid_folders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(root.join("Not A Slug")).unwrap();
        fs::create_dir_all(root.join("unsorted")).unwrap();
        write_png(&root.join("Not A Slug/x.png"), 1, 1);

        let albums = scan_photo_tree(&root, &ScanOptions::default()).unwrap();
        assert!(albums.is_empty());
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_photo_tree(dir.path().join("missing"), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }
}
