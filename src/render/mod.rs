//! Rendering seam
//!
//! The viewer never talks to a GPU directly. Each rendered tick hands a
//! [`Frame`] to a [`RenderBackend`], and disposal of content releases the
//! backend's copies of geometry and textures by id.

use crate::core::camera::Camera;
use crate::scene::{GeometryId, Scene, SceneStats, TextureId};

/// Everything a backend needs to draw one frame.
pub struct Frame<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    /// Camera for the corner axes gizmo
    pub axes_camera: &'a Camera,
    /// `0xRRGGBB`
    pub clear_color: u32,
    /// Last frame before the scheduler goes idle
    pub final_frame: bool,
}

/// Draws frames and owns GPU copies of scene resources.
pub trait RenderBackend {
    /// Viewport changed to `width` x `height` physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, frame: &Frame<'_>);

    /// Free the GPU buffers of a disposed geometry.
    fn release_geometry(&mut self, id: GeometryId);

    /// Free the GPU image of a disposed texture.
    fn release_texture(&mut self, id: TextureId);
}

/// Backend that draws nothing and records what it was asked to do.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    pub size: (u32, u32),
    pub frames: u64,
    pub final_frames: u64,
    /// Visible mesh counts of the most recent frame
    pub last_stats: SceneStats,
    pub released_geometries: Vec<GeometryId>,
    pub released_textures: Vec<TextureId>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for HeadlessBackend {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn render(&mut self, frame: &Frame<'_>) {
        self.frames += 1;
        if frame.final_frame {
            self.final_frames += 1;
        }
        self.last_stats = SceneStats::collect(frame.scene, frame.scene.graph.root());
    }

    fn release_geometry(&mut self, id: GeometryId) {
        self.released_geometries.push(id);
    }

    fn release_texture(&mut self, id: TextureId) {
        self.released_textures.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Geometry, Material, NodeContent};
    use glam::Vec3;

    #[test]
    fn test_headless_counts_frames() {
        let mut scene = Scene::new();
        let root = scene.graph.root();
        let geometry = scene.resources.add_geometry(Geometry::cuboid(Vec3::ONE));
        let material = scene.materials.add(Material::new("m"));
        scene.graph.add_child(root, "box", NodeContent::Mesh { geometry, material });
        let camera = Camera::default();

        let mut backend = HeadlessBackend::new();
        for final_frame in [false, true] {
            backend.render(&Frame {
                scene: &scene,
                camera: &camera,
                axes_camera: &camera,
                clear_color: 0xcccccc,
                final_frame,
            });
        }
        assert_eq!(backend.frames, 2);
        assert_eq!(backend.final_frames, 1);
        assert_eq!(backend.last_stats.triangles, 12);
    }
}
