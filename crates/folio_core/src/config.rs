//! Application configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub viewer: ViewerConfig,
    pub gesture: GestureConfig,
    pub store: StoreConfig,
    pub upload: UploadConfig,
    pub keybindings: HashMap<String, Vec<String>>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            viewer: ViewerConfig::default(),
            gesture: GestureConfig::default(),
            store: StoreConfig::default(),
            upload: UploadConfig::default(),
            keybindings: default_keybindings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Upper zoom bound; the lower bound is always 1
    pub max_zoom: f32,
    /// Scale a double tap zooms to
    pub double_tap_zoom: f32,
    /// Zoom step for keyboard zoom in/out
    pub zoom_step: f32,
    /// Decoded images kept within this distance of the current slide
    pub preload_radius: usize,
    /// Cached images beyond this distance are evicted
    pub evict_radius: usize,
    pub slide_ms: u64,
    pub snap_back_ms: u64,
    pub zoom_reset_ms: u64,
    /// Resistance applied to drags past the first/last photo
    pub rubber_band: f32,
    pub morph_ms: u64,
    /// Gap kept between the centred photo and the viewport edge
    pub morph_margin: f32,
    /// Longest wait for the full-resolution image before revealing anyway
    pub morph_safety_timeout_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            max_zoom: 4.0,
            double_tap_zoom: 2.5,
            zoom_step: 1.25,
            preload_radius: 2,
            evict_radius: 3,
            slide_ms: 300,
            snap_back_ms: 110,
            zoom_reset_ms: 250,
            rubber_band: 0.3,
            morph_ms: 350,
            morph_margin: 40.0,
            morph_safety_timeout_ms: 2500,
        }
    }
}

impl ViewerConfig {
    pub fn slide_duration(&self) -> Duration {
        Duration::from_millis(self.slide_ms)
    }

    pub fn snap_back_duration(&self) -> Duration {
        Duration::from_millis(self.snap_back_ms)
    }

    pub fn zoom_reset_duration(&self) -> Duration {
        Duration::from_millis(self.zoom_reset_ms)
    }

    pub fn morph_duration(&self) -> Duration {
        Duration::from_millis(self.morph_ms)
    }

    pub fn morph_safety_timeout(&self) -> Duration {
        Duration::from_millis(self.morph_safety_timeout_ms)
    }
}

/// Which sign of wheel `deltaY` pulls the viewer down toward dismissal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollSign {
    /// Content follows the fingers (macOS default): pulling down reports negative deltas
    #[serde(rename = "natural")]
    Natural,
    /// Classic wheels: scrolling down reports positive deltas
    #[serde(rename = "classic")]
    Classic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Touch/pointer movement before a direction is locked
    pub direction_lock_px: f32,
    /// Wheel samples before a direction is locked
    pub wheel_lock_samples: u32,
    /// Accumulated wheel delta before a direction is locked
    pub wheel_lock_delta: f32,
    pub wheel_quiet_horizontal_ms: u64,
    pub wheel_quiet_vertical_ms: u64,
    /// Fraction of viewport width a wheel burst must travel to navigate
    pub wheel_distance_ratio: f32,
    /// Units per millisecond
    pub wheel_velocity: f32,
    pub wheel_dismiss_distance: f32,
    pub dismiss_scroll_sign: ScrollSign,
    /// Fraction of viewport width a swipe must travel to navigate
    pub touch_distance_ratio: f32,
    /// Pixels per millisecond
    pub touch_velocity: f32,
    pub touch_dismiss_distance: f32,
    pub pinch_cooldown_ms: u64,
    pub double_tap_ms: u64,
    /// Maximum travel for a touch to still count as a tap
    pub tap_slop_px: f32,
    /// Album view swipe-to-close only applies up to this viewport width
    pub album_swipe_max_width: f32,
    /// Fraction of viewport width a rightward swipe must travel to close the album
    pub album_dismiss_ratio: f32,
    /// Pixels per millisecond
    pub album_dismiss_velocity: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            direction_lock_px: 10.0,
            wheel_lock_samples: 2,
            wheel_lock_delta: 10.0,
            wheel_quiet_horizontal_ms: 60,
            wheel_quiet_vertical_ms: 30,
            wheel_distance_ratio: 0.1,
            wheel_velocity: 0.3,
            wheel_dismiss_distance: 50.0,
            dismiss_scroll_sign: ScrollSign::Natural,
            touch_distance_ratio: 0.2,
            touch_velocity: 0.5,
            touch_dismiss_distance: 150.0,
            pinch_cooldown_ms: 400,
            double_tap_ms: 300,
            tap_slop_px: 10.0,
            album_swipe_max_width: 768.0,
            album_dismiss_ratio: 0.3,
            album_dismiss_velocity: 0.5,
        }
    }
}

/// Which content store backs the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    #[serde(rename = "github")]
    Github,
    #[serde(rename = "local")]
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Root of the local backend
    pub local_root: Option<PathBuf>,
    /// Environment variable holding the bearer token
    pub token_env: String,
    pub manifest_path: String,
    pub order_path: String,
    pub moves_path: String,
    /// Folder uploads land in and album folders live under
    pub photos_dir: String,
    /// Thumbnail folder name inside a photo folder
    pub grid_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Github,
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            local_root: None,
            token_env: "FOLIO_TOKEN".to_string(),
            manifest_path: "photos.json".to_string(),
            order_path: "order.json".to_string(),
            moves_path: "moves.json".to_string(),
            photos_dir: "photos".to_string(),
            grid_dir: "grid".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub allowed_extensions: Vec<String>,
    pub max_bytes: usize,
    pub min_dimension: u32,
    pub grid_height: u32,
    pub grid_quality: u8,
    /// Digits in generated filenames ("001")
    pub name_width: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["jpg".into(), "jpeg".into(), "png".into(), "webp".into()],
            max_bytes: 20 * 1024 * 1024,
            min_dimension: 200,
            grid_height: 640,
            grid_quality: 82,
            name_width: 3,
        }
    }
}

impl FolioConfig {
    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file, falling back to defaults when absent
    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Directory holding config and the persisted credential
    pub fn config_dir() -> PathBuf {
        ProjectDirs::from("com", "Folio", "Folio")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn default_keybindings() -> HashMap<String, Vec<String>> {
    let mut kb = HashMap::new();

    kb.insert("nav.next_item".into(), vec!["Right".into(), "l".into()]);
    kb.insert("nav.prev_item".into(), vec!["Left".into(), "h".into()]);
    kb.insert("viewer.close".into(), vec!["Escape".into()]);
    kb.insert("view.zoom_in".into(), vec!["Plus".into(), "=".into()]);
    kb.insert("view.zoom_out".into(), vec!["Minus".into()]);
    kb.insert("view.zoom_reset".into(), vec!["0".into()]);

    kb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: FolioConfig = toml::from_str(
            r#"
            [viewer]
            max_zoom = 6.0

            [store]
            owner = "me"
            repo = "site"
            backend = "local"
            "#,
        )
        .unwrap();

        assert_eq!(config.viewer.max_zoom, 6.0);
        assert_eq!(config.viewer.preload_radius, 2);
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert_eq!(config.store.manifest_path, "photos.json");
        assert_eq!(config.gesture.dismiss_scroll_sign, ScrollSign::Natural);
        assert!(config.keybindings.contains_key("nav.next_item"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FolioConfig::load_from(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config.upload.name_width, 3);
    }

    #[test]
    fn test_round_trip_toml() {
        let text = toml::to_string_pretty(&FolioConfig::default()).unwrap();
        let back: FolioConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.gesture.double_tap_ms, 300);
    }
}
