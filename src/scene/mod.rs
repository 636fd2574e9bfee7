//! Scene data: node hierarchy, materials and GPU-facing resources

pub mod graph;
pub mod material;
pub mod node;
pub mod resources;
pub mod stats;

use std::collections::BTreeSet;

pub use graph::SceneGraph;
pub use material::{MapSlot, Material, MaterialId, MaterialLibrary};
pub use node::{HelperKind, LightKind, LightSource, LocalTransform, NodeContent, SceneNode, SceneNodeId};
pub use resources::{ColorEncoding, Geometry, GeometryId, ResourceTracker, Texture, TextureId};
pub use stats::SceneStats;

use crate::math::Aabb;

/// Resources released by [`Scene::dispose_subtree`]
#[derive(Debug, Default, PartialEq)]
pub struct Disposed {
    pub nodes: usize,
    pub geometries: Vec<GeometryId>,
    pub textures: Vec<TextureId>,
}

/// A scene graph together with the materials and resources its nodes use.
#[derive(Debug, Default)]
pub struct Scene {
    pub graph: SceneGraph,
    pub materials: MaterialLibrary,
    pub resources: ResourceTracker,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// World-space bounds of every mesh under `root`, hidden ones included.
    pub fn world_bounds(&mut self, root: SceneNodeId) -> Option<Aabb> {
        self.graph.update_world_transforms();
        let mut bounds: Option<Aabb> = None;
        for id in self.graph.subtree(root) {
            let Some(node) = self.graph.get(id) else {
                continue;
            };
            let NodeContent::Mesh { geometry, .. } = node.content else {
                continue;
            };
            let Some(geometry) = self.resources.geometry(geometry) else {
                continue;
            };
            if geometry.bounds.is_empty() {
                continue;
            }
            let world = geometry.bounds.transformed(&node.world_transform);
            bounds = Some(match bounds {
                Some(b) => b.merged(&world),
                None => world,
            });
        }
        bounds
    }

    /// Materials referenced by meshes under `root`, each once.
    pub fn materials_in(&self, root: SceneNodeId) -> BTreeSet<MaterialId> {
        self.graph
            .subtree(root)
            .into_iter()
            .filter_map(|id| match self.graph.get(id)?.content {
                NodeContent::Mesh { material, .. } => Some(material),
                _ => None,
            })
            .collect()
    }

    /// Detach `root` and free everything its meshes reference: geometry,
    /// materials and the materials' textures. Shared resources are freed once.
    pub fn dispose_subtree(&mut self, root: SceneNodeId) -> Disposed {
        let materials = self.materials_in(root);
        let removed = self.graph.remove(root);

        let mut geometries = BTreeSet::new();
        for node in &removed {
            if let NodeContent::Mesh { geometry, .. } = node.content {
                geometries.insert(geometry);
            }
        }

        let mut textures = BTreeSet::new();
        for id in materials {
            if let Some(material) = self.materials.remove(id) {
                textures.extend(material.textures());
            }
        }

        Disposed {
            nodes: removed.len(),
            geometries: geometries
                .into_iter()
                .filter(|g| self.resources.dispose_geometry(*g))
                .collect(),
            textures: textures
                .into_iter()
                .filter(|t| self.resources.dispose_texture(*t))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn textured_scene() -> (Scene, SceneNodeId, GeometryId, TextureId) {
        let mut scene = Scene::new();
        let root = scene.graph.root();
        let texture = scene.resources.add_texture(Texture {
            name: "albedo.png".into(),
            dimensions: None,
            encoding: ColorEncoding::Srgb,
        });
        let mut material = Material::new("m");
        material.maps.insert(MapSlot::Map, texture);
        material.maps.insert(MapSlot::EmissiveMap, texture);
        let material = scene.materials.add(material);
        let geometry = scene.resources.add_geometry(Geometry::cuboid(Vec3::ONE));

        let content = scene.graph.add_child(root, "content", NodeContent::Group);
        scene.graph.set_transform(content, LocalTransform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        scene.graph.add_child(content, "a", NodeContent::Mesh { geometry, material });
        scene.graph.add_child(content, "b", NodeContent::Mesh { geometry, material });
        (scene, content, geometry, texture)
    }

    #[test]
    fn test_world_bounds_applies_transforms() {
        let (mut scene, content, _, _) = textured_scene();
        let bounds = scene.world_bounds(content).unwrap();
        assert_eq!(bounds.min, Vec3::new(9.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn test_world_bounds_without_meshes() {
        let mut scene = Scene::new();
        let root = scene.graph.root();
        let group = scene.graph.add_child(root, "empty", NodeContent::Group);
        assert!(scene.world_bounds(group).is_none());
    }

    #[test]
    fn test_dispose_frees_shared_resources_once() {
        let (mut scene, content, geometry, texture) = textured_scene();
        let disposed = scene.dispose_subtree(content);

        assert_eq!(disposed.nodes, 3);
        assert_eq!(disposed.geometries, vec![geometry]);
        assert_eq!(disposed.textures, vec![texture]);
        assert!(scene.resources.is_geometry_disposed(geometry));
        assert!(scene.resources.is_texture_disposed(texture));
        assert!(scene.materials.is_empty());
        assert_eq!(scene.graph.node_count(), 1);
    }
}
