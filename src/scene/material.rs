//! Surface materials and the library that owns them

use std::collections::{BTreeMap, HashMap};

use glam::Vec4;

use super::resources::TextureId;
use crate::core::types::color_from_hex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// Texture slots a material can sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapSlot {
    Map,
    AoMap,
    EmissiveMap,
    GlossinessMap,
    MetalnessMap,
    NormalMap,
    RoughnessMap,
    SpecularMap,
}

impl MapSlot {
    pub const ALL: [MapSlot; 8] = [
        MapSlot::Map,
        MapSlot::AoMap,
        MapSlot::EmissiveMap,
        MapSlot::GlossinessMap,
        MapSlot::MetalnessMap,
        MapSlot::NormalMap,
        MapSlot::RoughnessMap,
        MapSlot::SpecularMap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MapSlot::Map => "map",
            MapSlot::AoMap => "aoMap",
            MapSlot::EmissiveMap => "emissiveMap",
            MapSlot::GlossinessMap => "glossinessMap",
            MapSlot::MetalnessMap => "metalnessMap",
            MapSlot::NormalMap => "normalMap",
            MapSlot::RoughnessMap => "roughnessMap",
            MapSlot::SpecularMap => "specularMap",
        }
    }

    /// Slots whose texels are colors rather than data.
    pub fn carries_color(self) -> bool {
        matches!(self, MapSlot::Map | MapSlot::EmissiveMap)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// Linear RGBA base color
    pub color: Vec4,
    pub transparent: bool,
    pub depth_write: bool,
    /// Fragments with alpha below this are discarded
    pub alpha_test: f32,
    pub wireframe: bool,
    /// Ignore lighting and draw the flat color
    pub unlit: bool,
    /// Backend must re-upload or recompile before the next draw
    pub needs_update: bool,
    pub maps: BTreeMap<MapSlot, TextureId>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Vec4::ONE,
            transparent: false,
            depth_write: true,
            alpha_test: 0.0,
            wireframe: false,
            unlit: false,
            needs_update: false,
            maps: BTreeMap::new(),
        }
    }

    /// Flat, unlit, opaque tint used to mark the selected node.
    pub fn highlight(hex: u32) -> Self {
        Self {
            color: color_from_hex(hex).extend(1.0),
            unlit: true,
            ..Self::new("highlight")
        }
    }

    pub fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.maps.values().copied()
    }
}

/// Owns every material referenced by scene nodes.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: HashMap<MaterialId, Material>,
    next_id: u32,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next_id);
        self.next_id += 1;
        self.materials.insert(id, material);
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    pub fn remove(&mut self, id: MaterialId) -> Option<Material> {
        self.materials.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
