//! Geometry and texture data, with disposal tracking.
//!
//! An id stays known to the [`ResourceTracker`] after its data is freed, so
//! callers can ask whether a resource was disposed, until
//! [`ResourceTracker::prune_disposed`] forgets it. Ids are never reused.

use std::collections::HashMap;

use glam::Vec3;

use crate::math::Aabb;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Indexed or non-indexed triangle list
#[derive(Clone, Debug)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub indices: Option<Vec<u32>>,
    /// Local-space bounds of `positions`
    pub bounds: Aabb,
}

impl Geometry {
    pub fn new(positions: Vec<Vec3>, indices: Option<Vec<u32>>) -> Self {
        let bounds = Aabb::from_points(positions.iter().copied()).unwrap_or_else(Aabb::empty);
        Self {
            positions,
            indices,
            bounds,
        }
    }

    /// Axis-aligned box centered on the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let positions = Aabb::new(-h, h).corners().to_vec();
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 1, 2, 3, // -z
            4, 5, 6, 5, 7, 6, // +z
            0, 1, 4, 1, 5, 4, // -y
            2, 6, 3, 3, 6, 7, // +y
            0, 4, 2, 2, 4, 6, // -x
            1, 3, 5, 3, 7, 5, // +x
        ];
        Self::new(positions, Some(indices))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Triangle corners. Triangles with out-of-range indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        let count = self.triangle_count();
        (0..count).filter_map(move |t| {
            let corner = |k: usize| -> Option<Vec3> {
                let index = match &self.indices {
                    Some(indices) => *indices.get(t * 3 + k)? as usize,
                    None => t * 3 + k,
                };
                self.positions.get(index).copied()
            };
            Some([corner(0)?, corner(1)?, corner(2)?])
        })
    }
}

/// How texel values are to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorEncoding {
    Linear,
    Srgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    /// Source file name, or a generated label for embedded images
    pub name: String,
    /// Pixel size when the image could be decoded
    pub dimensions: Option<(u32, u32)>,
    pub encoding: ColorEncoding,
}

#[derive(Debug)]
enum Slot<T> {
    Live(T),
    Disposed,
}

impl<T> Slot<T> {
    fn live(&self) -> Option<&T> {
        match self {
            Slot::Live(v) => Some(v),
            Slot::Disposed => None,
        }
    }

    fn live_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Live(v) => Some(v),
            Slot::Disposed => None,
        }
    }
}

/// Owns geometry and texture data and remembers what has been disposed.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    geometries: HashMap<GeometryId, Slot<Geometry>>,
    textures: HashMap<TextureId, Slot<Texture>>,
    next_geometry: u32,
    next_texture: u32,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.geometries.insert(id, Slot::Live(geometry));
        id
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, Slot::Live(texture));
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(&id).and_then(Slot::live)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(&id).and_then(Slot::live)
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.textures.get_mut(&id).and_then(Slot::live_mut)
    }

    /// Free the geometry data. Returns `false` if it was unknown or already
    /// disposed.
    pub fn dispose_geometry(&mut self, id: GeometryId) -> bool {
        match self.geometries.get_mut(&id) {
            Some(slot) if slot.live().is_some() => {
                *slot = Slot::Disposed;
                true
            }
            _ => false,
        }
    }

    pub fn dispose_texture(&mut self, id: TextureId) -> bool {
        match self.textures.get_mut(&id) {
            Some(slot) if slot.live().is_some() => {
                *slot = Slot::Disposed;
                true
            }
            _ => false,
        }
    }

    pub fn is_geometry_disposed(&self, id: GeometryId) -> bool {
        matches!(self.geometries.get(&id), Some(Slot::Disposed))
    }

    pub fn is_texture_disposed(&self, id: TextureId) -> bool {
        matches!(self.textures.get(&id), Some(Slot::Disposed))
    }

    pub fn live_geometry_count(&self) -> usize {
        self.geometries.values().filter(|s| s.live().is_some()).count()
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.values().filter(|s| s.live().is_some()).count()
    }

    /// Every geometry id ever minted, live or disposed.
    pub fn geometry_ids(&self) -> impl Iterator<Item = GeometryId> + '_ {
        self.geometries.keys().copied()
    }

    /// Every texture id ever minted, live or disposed.
    pub fn texture_ids(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.keys().copied()
    }

    /// Forget disposed entries. Returns how many were dropped.
    pub fn prune_disposed(&mut self) -> usize {
        let before = self.geometries.len() + self.textures.len();
        self.geometries.retain(|_, slot| slot.live().is_some());
        self.textures.retain(|_, slot| slot.live().is_some());
        before - self.geometries.len() - self.textures.len()
    }
}
