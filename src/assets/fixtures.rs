//! In-memory glTF assets for tests

use std::io::Cursor;

use glam::Vec3;
use serde_json::{Value, json};

use super::bundle::AssetBundle;
use crate::scene::Geometry;

/// Cube with positions and indices in two separate buffers and one texture.
pub fn cube_gltf() -> Value {
    json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "name": "Scene", "nodes": [0] }],
        "nodes": [{ "name": "Cube", "mesh": 0, "extras": { "id": "cube-1" } }],
        "meshes": [{
            "name": "Cube",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "materials": [{
            "name": "Body",
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } },
            "emissiveTexture": { "index": 0 }
        }],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": "albedo.png" }],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 8, "type": "VEC3",
                "min": [-1.0, -1.0, -1.0], "max": [1.0, 1.0, 1.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 36, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteLength": 96 },
            { "buffer": 1, "byteLength": 72 }
        ],
        "buffers": [
            { "uri": "positions.bin", "byteLength": 96 },
            { "uri": "indices.bin", "byteLength": 72 }
        ]
    })
}

/// Position and index buffers matching [`cube_gltf`].
pub fn cube_buffers() -> (Vec<u8>, Vec<u8>) {
    let cube = Geometry::cuboid(Vec3::ONE);
    let positions = cube
        .positions
        .iter()
        .flat_map(|p| p.to_array())
        .flat_map(f32::to_le_bytes)
        .collect();
    let indices = cube
        .indices
        .unwrap_or_default()
        .into_iter()
        .flat_map(|i| (i as u16).to_le_bytes())
        .collect();
    (positions, indices)
}

/// A 2x2 PNG.
pub fn png() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// `scene.gltf` + two buffers + one texture, under `dir`.
pub fn cube_bundle(dir: &str) -> AssetBundle {
    let (positions, indices) = cube_buffers();
    let mut bundle = AssetBundle::new();
    bundle.insert(&format!("{}scene.gltf", dir), serde_json::to_vec(&cube_gltf()).unwrap());
    bundle.insert(&format!("{}positions.bin", dir), positions);
    bundle.insert(&format!("{}indices.bin", dir), indices);
    bundle.insert(&format!("{}albedo.png", dir), png());
    bundle
}

/// Three cubes named `Model_LOD0`..`Model_LOD2`, all sharing the cube buffers.
pub fn lod_gltf() -> Value {
    let mut json = cube_gltf();
    json["nodes"] = json!([
        { "name": "Model", "children": [1, 2, 3] },
        { "name": "Model_LOD0", "mesh": 0 },
        { "name": "Model_LOD1", "mesh": 0, "translation": [3.0, 0.0, 0.0] },
        { "name": "Model_LOD2", "mesh": 0, "translation": [6.0, 0.0, 0.0] }
    ]);
    json
}
