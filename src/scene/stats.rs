//! Mesh, vertex and triangle counts

use serde::Serialize;

use super::node::{NodeContent, SceneNodeId};
use super::Scene;

/// Counts over the visible meshes of a subtree
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SceneStats {
    pub meshes: usize,
    pub vertices: usize,
    pub triangles: usize,
}

impl SceneStats {
    /// Walk the visible part of the subtree rooted at `root`.
    pub fn collect(scene: &Scene, root: SceneNodeId) -> Self {
        let mut stats = SceneStats::default();
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
            stats.meshes += 1;
            stats.vertices += geometry.vertex_count();
            stats.triangles += geometry.triangle_count();
        }
        stats
    }
}

impl std::fmt::Display for SceneStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} meshes, {} vertices, {} triangles",
            self.meshes, self.vertices, self.triangles
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::material::Material;
    use crate::scene::resources::Geometry;
    use glam::Vec3;

    #[test]
    fn test_counts_visible_meshes_only() {
        let mut scene = Scene::new();
        let root = scene.graph.root();
        let material = scene.materials.add(Material::new("m"));

        let cube = scene.resources.add_geometry(Geometry::cuboid(Vec3::ONE));
        scene.graph.add_child(root, "cube", NodeContent::Mesh { geometry: cube, material });

        let soup = scene.resources.add_geometry(Geometry::new(vec![Vec3::ZERO; 6], None));
        scene.graph.add_child(root, "soup", NodeContent::Mesh { geometry: soup, material });

        let hidden_group = scene.graph.add_child(root, "hidden", NodeContent::Group);
        scene.graph.add_child(hidden_group, "inner", NodeContent::Mesh { geometry: cube, material });
        scene.graph.set_visible(hidden_group, false);

        let stats = SceneStats::collect(&scene, root);
        assert_eq!(stats, SceneStats { meshes: 2, vertices: 14, triangles: 14 });
        assert_eq!(stats.to_string(), "2 meshes, 14 vertices, 14 triangles");
    }
}
