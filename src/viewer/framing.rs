//! Camera framing for freshly loaded content.
//!
//! The content root is recentered additively, then the camera, its clip
//! planes and the orbit limits are derived from the size of the content.

use glam::Vec3;

use crate::core::camera::Camera;
use crate::core::camera_controller::OrbitControls;
use crate::scene::{LocalTransform, Scene, SceneNodeId};
use crate::viewer::overlay::AxesOverlay;

/// Center and diagonal length of the content's world-space AABB.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingVolume {
    pub center: Vec3,
    pub size: f32,
}

/// Result of [`frame`]: the volume before recentering and the placement
/// that "reset view" restores.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Framing {
    pub bounds: BoundingVolume,
    /// Orbit target and look-at point: the measured center.
    pub target: Vec3,
    pub camera_position: Vec3,
    pub near: f32,
    pub far: f32,
}

/// Measure the meshes under `root` in world space.
///
/// Hidden meshes count too, so every detail level contributes.
pub fn bounding_volume(scene: &mut Scene, root: SceneNodeId) -> BoundingVolume {
    match scene.world_bounds(root) {
        Some(aabb) => BoundingVolume {
            center: aabb.center(),
            size: aabb.diagonal(),
        },
        None => BoundingVolume::default(),
    }
}

/// Frame `root` for `camera` and `controls`, mirroring the placement onto
/// the axes overlay.
///
/// Empty content keeps the previous clip planes and camera position and
/// only moves the orbit target.
pub fn frame(
    scene: &mut Scene,
    root: SceneNodeId,
    camera: &mut Camera,
    controls: &mut OrbitControls,
    axes: &mut AxesOverlay,
) -> Framing {
    let bounds = bounding_volume(scene, root);

    // position += position - center, expressed in the parent's space
    let parent_world = scene
        .graph
        .get(root)
        .and_then(|n| n.parent)
        .map(|p| scene.graph.world_transform(p))
        .unwrap_or_default();
    let mut transform = scene
        .graph
        .get(root)
        .map(|n| n.local_transform.clone())
        .unwrap_or_else(LocalTransform::identity);
    let world_position = parent_world.transform_point3(transform.position);
    let offset = world_position - bounds.center;
    if bounds.size > 0.0 {
        transform.position += parent_world.inverse().transform_vector3(offset);
        scene.graph.set_transform(root, transform);
        scene.graph.update_world_transforms();
    }
    let target = bounds.center;

    let size = bounds.size;
    if size > 0.0 {
        camera.near = size / 100.0;
        camera.far = size * 100.0;
        controls.max_distance = size * 10.0;
        camera.position = target + Vec3::splat(size);
    }
    camera.look_at(target);
    controls.target = target;
    controls.save_state(camera);
    axes.place_like(camera);

    log::debug!(
        "Framed content: center {:?}, size {:.3}, near {:.4}, far {:.1}",
        bounds.center,
        size,
        camera.near,
        camera.far
    );

    Framing {
        bounds,
        target,
        camera_position: camera.position,
        near: camera.near,
        far: camera.far,
    }
}
