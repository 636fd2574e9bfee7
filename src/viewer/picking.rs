//! Pointer picking and the highlighted selection.

use glam::{Vec2, Vec3};

use crate::core::camera::Camera;
use crate::math::Ray;
use crate::scene::{Material, MaterialId, MaterialLibrary, NodeContent, Scene, SceneNodeId};

/// Canvas placement in window pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    /// Canvas filling a `width` x `height` window.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Normalized device coordinates of a window point, +Y up.
    /// `None` for a zero-sized canvas.
    pub fn to_ndc(&self, x: f32, y: f32) -> Option<Vec2> {
        if self.is_degenerate() {
            return None;
        }
        Some(Vec2::new(
            (x - self.left) / self.width * 2.0 - 1.0,
            -((y - self.top) / self.height) * 2.0 + 1.0,
        ))
    }
}

/// Nearest intersection found by [`raycast`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub node: SceneNodeId,
    /// Ray parameter of the hit
    pub distance: f32,
    pub point: Vec3,
}

/// Intersect `ray` with the visible meshes under `root`.
///
/// World transforms must be current. Each mesh is tested in its local space:
/// bounding box first, then every triangle.
pub fn raycast(scene: &Scene, root: SceneNodeId, ray: &Ray) -> Option<Hit> {
    let mut nearest: Option<Hit> = None;
    for id in scene.graph.visible_subtree(root) {
        let Some(node) = scene.graph.get(id) else {
            continue;
        };
        let NodeContent::Mesh { geometry, .. } = node.content else {
            continue;
        };
        let Some(geometry) = scene.resources.geometry(geometry) else {
            continue;
        };
        if node.world_transform.determinant().abs() <= f32::EPSILON {
            continue;
        }
        let local = ray.transform(&node.world_transform.inverse());
        let Some((t_near, t_far)) = local.intersects_aabb(&geometry.bounds) else {
            continue;
        };
        // Local and world ray parameters agree, so hits compare across meshes
        if t_far < 0.0 || nearest.is_some_and(|hit| hit.distance < t_near) {
            continue;
        }
        for [a, b, c] in geometry.triangles() {
            let Some(t) = local.intersects_triangle(a, b, c) else {
                continue;
            };
            if nearest.is_none_or(|hit| t < hit.distance) {
                nearest = Some(Hit {
                    node: id,
                    distance: t,
                    point: ray.at(t),
                });
            }
        }
    }
    nearest
}

/// The selected node and the material it had before highlighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub node: SceneNodeId,
    pub saved_material: MaterialId,
}

/// Keeps at most one node highlighted.
pub struct Picker {
    highlight: MaterialId,
    selection: Option<Selection>,
}

impl Picker {
    /// Registers the highlight material in `materials`.
    pub fn new(materials: &mut MaterialLibrary, highlight_color: u32) -> Self {
        Self {
            highlight: materials.add(Material::highlight(highlight_color)),
            selection: None,
        }
    }

    pub fn highlight_material(&self) -> MaterialId {
        self.highlight
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn selected(&self) -> Option<SceneNodeId> {
        self.selection.map(|s| s.node)
    }

    /// Select whatever lies under window point `(x, y)`, or clear the
    /// selection on a miss. A degenerate canvas changes nothing.
    pub fn pick(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        x: f32,
        y: f32,
        canvas: &CanvasRect,
    ) -> Option<SceneNodeId> {
        let Some(ndc) = canvas.to_ndc(x, y) else {
            return self.selected();
        };
        scene.graph.update_world_transforms();
        let ray = camera.ray_through_ndc(ndc);
        match raycast(scene, scene.graph.root(), &ray) {
            Some(hit) if self.selected() == Some(hit.node) => {}
            Some(hit) => {
                self.restore(scene);
                self.select(scene, hit.node);
            }
            None => self.restore(scene),
        }
        self.selected()
    }

    fn select(&mut self, scene: &mut Scene, node: SceneNodeId) {
        let Some(NodeContent::Mesh { material, .. }) = scene.graph.get_mut(node).map(|n| &mut n.content)
        else {
            return;
        };
        let saved_material = std::mem::replace(material, self.highlight);
        self.selection = Some(Selection { node, saved_material });
        log::debug!("Selected node {:?}", node);
    }

    /// Put the saved material back and drop the selection. A node that no
    /// longer exists is simply forgotten.
    pub fn restore(&mut self, scene: &mut Scene) {
        let Some(selection) = self.selection.take() else {
            return;
        };
        if let Some(NodeContent::Mesh { material, .. }) =
            scene.graph.get_mut(selection.node).map(|n| &mut n.content)
        {
            *material = selection.saved_material;
        }
    }
}
