//! Default two-light rig that follows the camera.

use std::f32::consts::FRAC_PI_3;

use glam::Vec3;

use crate::core::camera::Camera;
use crate::core::types::color_from_hex;
use crate::scene::{LightKind, LightSource, LocalTransform, NodeContent, SceneGraph, SceneNodeId};
use crate::viewer::state::ViewerState;

/// Directional light offset in camera space: about 60 degrees above the view axis.
pub fn directional_offset() -> Vec3 {
    Vec3::new(FRAC_PI_3.cos(), 0.0, FRAC_PI_3.sin())
}

/// Ambient plus directional light, parented to a group kept at the
/// camera's placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightRig {
    pub group: SceneNodeId,
    pub ambient: SceneNodeId,
    pub directional: SceneNodeId,
}

impl LightRig {
    pub fn add(graph: &mut SceneGraph, state: &ViewerState) -> Self {
        let root = graph.root();
        let group = graph.add_child(root, "light_rig", NodeContent::Group);
        let ambient = graph.add_child(
            group,
            "ambient_light",
            NodeContent::Light(LightSource {
                kind: LightKind::Ambient,
                color: color_from_hex(state.ambient_color),
                intensity: state.ambient_intensity,
            }),
        );
        let directional = graph.add_child(
            group,
            "main_light",
            NodeContent::Light(LightSource {
                kind: LightKind::Directional,
                color: color_from_hex(state.direct_color),
                intensity: state.direct_intensity,
            }),
        );
        graph.set_transform(directional, LocalTransform::from_position(directional_offset()));
        log::debug!("Added default light rig");
        Self { group, ambient, directional }
    }

    pub fn remove(self, graph: &mut SceneGraph) {
        graph.remove(self.group);
        log::debug!("Removed default light rig");
    }

    /// Copy colors and intensities from the display state.
    pub fn apply(&self, graph: &mut SceneGraph, state: &ViewerState) {
        let settings = [
            (self.ambient, state.ambient_color, state.ambient_intensity),
            (self.directional, state.direct_color, state.direct_intensity),
        ];
        for (id, hex, intensity) in settings {
            if let Some(NodeContent::Light(light)) = graph.get_mut(id).map(|n| &mut n.content) {
                light.color = color_from_hex(hex);
                light.intensity = intensity;
            }
        }
    }

    /// Keep the rig attached to the camera.
    pub fn follow(&self, graph: &mut SceneGraph, camera: &Camera) {
        graph.set_transform(
            self.group,
            LocalTransform {
                position: camera.position,
                rotation: camera.rotation,
                scale: Vec3::ONE,
            },
        );
    }
}
