//! Display state record shared with the parameter panel.
//!
//! Writing fields has no effect on its own; the viewer picks changes up in
//! `update_display` and `update_lights`.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerState {
    pub wireframe: bool,
    /// Grid and axes helpers
    pub grid: bool,
    /// Default light rig
    pub add_lights: bool,
    pub ambient_intensity: f32,
    /// `0xRRGGBB`
    pub ambient_color: u32,
    pub direct_intensity: f32,
    /// `0xRRGGBB`
    pub direct_color: u32,
    pub auto_rotate: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            wireframe: false,
            grid: false,
            add_lights: true,
            ambient_intensity: 0.3,
            ambient_color: 0xFFFFFF,
            direct_intensity: 0.8 * PI,
            direct_color: 0xFFFFFF,
            auto_rotate: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = ViewerState::default();
        assert!(!state.wireframe && !state.grid && !state.auto_rotate);
        assert!(state.add_lights);
        assert_eq!(state.ambient_intensity, 0.3);
        assert!((state.direct_intensity - 2.513_274).abs() < 1e-5);
        assert_eq!(state.direct_color, 0xFFFFFF);
    }

    #[test]
    fn test_partial_json() {
        let state: ViewerState = serde_json::from_str(r#"{ "wireframe": true }"#).unwrap();
        assert!(state.wireframe);
        assert!(state.add_lights);
    }
}
