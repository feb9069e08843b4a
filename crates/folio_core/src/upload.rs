//! Upload preparation
//!
//! Everything here runs before any network call: validation, numbering,
//! grid thumbnail encoding and the local preview used until the remote copy
//! is deployed.

use crate::catalog::{MediaCatalog, Photo};
use crate::config::{StoreConfig, UploadConfig};
use crate::error::{FolioError, Result};
use crate::journal::PendingJournal;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::collections::HashMap;
use std::io::Cursor;

/// A file picked by the user
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Lowercase extension without the dot
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// Validated, encoded upload ready to be written
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub photo: Photo,
    pub full: Vec<u8>,
    pub grid: Vec<u8>,
    /// `data:` URL of the grid thumbnail
    pub preview: String,
}

/// Reject files before anything is decoded or sent
pub fn validate(file: &UploadFile, config: &UploadConfig) -> Result<(String, DynamicImage)> {
    let ext = file
        .extension()
        .filter(|ext| config.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .ok_or_else(|| FolioError::UnsupportedFormat(file.name.clone()))?;

    if file.bytes.len() > config.max_bytes {
        return Err(FolioError::FileTooLarge {
            size: file.bytes.len(),
            limit: config.max_bytes,
        });
    }

    let img = ImageReader::new(Cursor::new(&file.bytes))
        .with_guessed_format()?
        .decode()?;

    let (width, height) = img.dimensions();
    if width < config.min_dimension || height < config.min_dimension {
        return Err(FolioError::ImageTooSmall {
            width,
            height,
            min: config.min_dimension,
        });
    }

    Ok((ext, img))
}

/// 1 + the largest numeric filename stem among live and staged-delete photos
pub fn next_file_number(catalog: &MediaCatalog, journal: &PendingJournal) -> u32 {
    let live = catalog.photos().map(|p| stem_of(&p.source_path));
    let deleted = journal.deletes().iter().map(|d| stem_of(&d.source_path));

    live.chain(deleted)
        .filter_map(|stem| stem.parse::<u32>().ok())
        .max()
        .map_or(1, |n| n + 1)
}

fn stem_of(path: &str) -> &str {
    let name = path.rsplit_once('/').map_or(path, |(_, name)| name);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Zero-padded stem (`001`)
pub fn numbered_stem(number: u32, width: usize) -> String {
    format!("{:0width$}", number, width = width)
}

/// Fixed-height JPEG thumbnail; never upscales
pub fn grid_thumbnail(img: &DynamicImage, height: u32, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = img.dimensions();
    let target_h = height.min(h).max(1);
    let target_w = ((w as f64 * target_h as f64 / h as f64).round() as u32).max(1);

    let thumb = if target_h < h {
        img.resize_exact(target_w, target_h, FilterType::Triangle)
    } else {
        img.clone()
    };

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    thumb.to_rgb8().write_with_encoder(encoder)?;
    Ok(bytes)
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Validate, number and encode one upload
pub fn prepare_upload(
    file: UploadFile,
    number: u32,
    upload: &UploadConfig,
    store: &StoreConfig,
) -> Result<PreparedUpload> {
    let (ext, img) = validate(&file, upload)?;
    let (width, height) = img.dimensions();

    let stem = numbered_stem(number, upload.name_width);
    let source_path = format!("{}/{}.{}", store.photos_dir, stem, ext);
    let grid_path = format!("{}/{}/{}.jpg", store.photos_dir, store.grid_dir, stem);

    let grid = grid_thumbnail(&img, upload.grid_height, upload.grid_quality)?;
    let preview = data_url("image/jpeg", &grid);

    tracing::debug!("Prepared upload {} -> {} ({}x{})", file.name, source_path, width, height);
    Ok(PreparedUpload {
        photo: Photo::new(source_path, grid_path, width, height),
        full: file.bytes,
        grid,
        preview,
    })
}

#[derive(Debug, Clone)]
struct PreviewEntry {
    source_path: String,
    data_url: String,
}

/// Local previews of thumbnails not yet served by the remote site
#[derive(Debug, Clone, Default)]
pub struct UploadPreviewCache {
    entries: HashMap<String, PreviewEntry>,
}

impl UploadPreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, photo: &Photo, data_url: String) {
        self.entries.insert(
            photo.grid_path.clone(),
            PreviewEntry {
                source_path: photo.source_path.clone(),
                data_url,
            },
        );
    }

    /// Preview for a grid path
    pub fn get(&self, grid_path: &str) -> Option<&str> {
        self.entries.get(grid_path).map(|e| e.data_url.as_str())
    }

    /// Was this photo uploaded during the current session?
    pub fn is_uploaded(&self, source_path: &str) -> bool {
        self.entries.values().any(|e| e.source_path == source_path)
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
    use crate::catalog::Album;
    use image::{ImageFormat, RgbImage};

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([120, 80, 200])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_validation() {
        let config = UploadConfig::default();

        let err = validate(&UploadFile::new("notes.txt", b"hello".to_vec()), &config).unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedFormat(_)));

        let err = validate(&UploadFile::new("noext", png(300, 300)), &config).unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedFormat(_)));

        let small = UploadConfig { max_bytes: 10, ..UploadConfig::default() };
        let err = validate(&UploadFile::new("a.png", png(300, 300)), &small).unwrap_err();
        assert!(matches!(err, FolioError::FileTooLarge { limit: 10, .. }));

        let err = validate(&UploadFile::new("a.png", png(300, 100)), &config).unwrap_err();
        assert!(matches!(err, FolioError::ImageTooSmall { width: 300, height: 100, min: 200 }));

        let err = validate(&UploadFile::new("a.jpg", b"not an image".to_vec()), &config).unwrap_err();
        assert!(matches!(err, FolioError::ImageDecode(_)));
        assert!(err.is_validation());

        let (ext, img) = validate(&UploadFile::new("Photo.PNG", png(300, 250)), &config).unwrap();
        assert_eq!(ext, "png");
        assert_eq!(img.dimensions(), (300, 250));
    }

    #[test]
    fn test_next_file_number() {
        let mut catalog = MediaCatalog::from_albums(vec![Album {
            slug: "trips".into(),
            photos: vec![
                Photo::new("photos/trips/004.jpg", "photos/trips/grid/004.jpg", 1, 1),
                Photo::new("photos/trips/cover.jpg", "photos/trips/grid/cover.jpg", 1, 1),
            ],
        }]);
        let mut journal = PendingJournal::new();
        assert_eq!(next_file_number(&catalog, &journal), 5);

        journal.record_delete(&Photo::new("photos/012.jpg", "photos/grid/012.jpg", 1, 1));
        assert_eq!(next_file_number(&catalog, &journal), 13);

        catalog = MediaCatalog::new();
        assert_eq!(next_file_number(&catalog, &PendingJournal::new()), 1);
        assert_eq!(numbered_stem(1, 3), "001");
        assert_eq!(numbered_stem(1234, 3), "1234");
    }

    #[test]
    fn test_prepare_upload() {
        let prepared = prepare_upload(
            UploadFile::new("IMG_1.png", png(1600, 1200)),
            7,
            &UploadConfig::default(),
            &StoreConfig::default(),
        )
        .unwrap();

        assert_eq!(prepared.photo.source_path, "photos/007.png");
        assert_eq!(prepared.photo.grid_path, "photos/grid/007.jpg");
        assert_eq!((prepared.photo.width, prepared.photo.height), (1600, 1200));
        assert!(prepared.preview.starts_with("data:image/jpeg;base64,"));

        let thumb = image::load_from_memory(&prepared.grid).unwrap();
        assert_eq!(thumb.height(), 640);
        assert!(thumb.width() >= 850 && thumb.width() <= 854);
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let img = image::load_from_memory(&png(400, 300)).unwrap();
        let thumb = image::load_from_memory(&grid_thumbnail(&img, 640, 80).unwrap()).unwrap();
        assert_eq!(thumb.dimensions(), (400, 300));
    }

    #[test]
    fn test_preview_cache() {
        let mut cache = UploadPreviewCache::new();
        let photo = Photo::new("photos/001.jpg", "photos/grid/001.jpg", 1, 1);
        cache.insert(&photo, "data:x".into());

        assert_eq!(cache.get("photos/grid/001.jpg"), Some("data:x"));
        assert!(cache.is_uploaded("photos/001.jpg"));
        assert!(!cache.is_uploaded("photos/002.jpg"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
