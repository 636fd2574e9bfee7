//! Viewer configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::viewer::lod::LodLevel;

/// Tunables for a viewer instance. Every field has a default, so a config
/// file only needs to name what it changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Continuous-render window after an interaction starts or ends.
    pub interaction_window_ms: u64,
    /// Continuous-render window after a viewport resize.
    pub resize_window_ms: u64,
    /// Continuous-render window after a load installs new content.
    pub settle_window_ms: u64,
    /// Minimum spacing between applied resize events.
    pub resize_throttle_ms: u64,
    /// Vertical field of view of the main camera, in degrees.
    pub fov_degrees: f32,
    /// Background color, `0xRRGGBB`.
    pub clear_color: u32,
    /// Tint of the flat material that marks the selected node.
    pub highlight_color: u32,
    /// Detail levels, finest first.
    pub lod_levels: Vec<LodLevel>,
    /// Field of the sidecar JSON that holds each entry's object identifier.
    pub metadata_id_field: String,
    /// Directory that external (non-bundle) references are read from.
    pub asset_base_dir: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            interaction_window_ms: 1000,
            resize_window_ms: 1000,
            settle_window_ms: 1000,
            resize_throttle_ms: 50,
            fov_degrees: 60.0,
            clear_color: 0xcccccc,
            highlight_color: 0xff6600,
            lod_levels: LodLevel::default_levels(),
            metadata_id_field: "id".to_string(),
            asset_base_dir: None,
        }
    }
}

impl ViewerConfig {
    /// Parse a config from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn interaction_window(&self) -> Duration {
        Duration::from_millis(self.interaction_window_ms)
    }

    pub fn resize_window(&self) -> Duration {
        Duration::from_millis(self.resize_window_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn resize_throttle(&self) -> Duration {
        Duration::from_millis(self.resize_throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.interaction_window(), Duration::from_millis(1000));
        assert_eq!(config.resize_throttle(), Duration::from_millis(50));
        assert_eq!(config.lod_levels.len(), 3);
        assert_eq!(config.metadata_id_field, "id");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json_str(r#"{ "settle_window_ms": 250 }"#).unwrap();
        assert_eq!(config.settle_window(), Duration::from_millis(250));
        assert_eq!(config.fov_degrees, 60.0);
    }

    #[test]
    fn test_lod_levels_from_json() {
        let config = ViewerConfig::from_json_str(
            r#"{ "lod_levels": [
                { "distance_threshold": 0.0, "visible": [0, 2] },
                { "distance_threshold": 50.0, "visible": [1, 2] }
            ] }"#,
        )
        .unwrap();
        assert_eq!(config.lod_levels.len(), 2);
        assert!(config.lod_levels[0].visible.contains(&2));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ViewerConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "highlight_color": 65280 }}"#).unwrap();
        let config = ViewerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.highlight_color, 0x00ff00);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ViewerConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
