//! Driver for the external glTF loader.
//!
//! Parsing, optional decompression of compressed geometry streams and
//! conversion of the selected glTF scene into [`Scene`] nodes.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Quat, Vec3, Vec4};
use gltf::Gltf;
use gltf::json::validation::{Error as ValidationError, Validate};
use gltf::khr_lights_punctual::Kind as GltfLightKind;
use gltf::material::AlphaMode;
use gltf::mesh::Mode;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::scene::{
    ColorEncoding, Geometry, LightKind, LightSource, LocalTransform, MapSlot, Material, MaterialId,
    GeometryId, NodeContent, Scene, SceneNodeId, Texture, TextureId,
};

pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";
pub const MESHOPT_EXTENSION: &str = "EXT_meshopt_compression";

/// Output of a [`MeshDecompressor`].
#[derive(Debug)]
pub enum Decoded {
    /// A whole primitive (`KHR_draco_mesh_compression`)
    Geometry(Geometry),
    /// The uncompressed bytes of one buffer view (`EXT_meshopt_compression`)
    BufferView(Vec<u8>),
}

/// Decoder for one geometry compression extension.
pub trait MeshDecompressor: Send + Sync {
    /// Extension name this decoder handles, e.g. `KHR_draco_mesh_compression`.
    fn extension(&self) -> &str;

    /// Decode `bytes` using the extension's JSON parameters (the attribute
    /// map for Draco, the whole extension object for meshopt).
    fn decode(&self, bytes: &[u8], params: &serde_json::Value) -> Result<Decoded>;
}

fn is_compression(extension: &str) -> bool {
    extension == DRACO_EXTENSION || extension == MESHOPT_EXTENSION
}

fn find_decompressor<'a>(
    decompressors: &'a [Arc<dyn MeshDecompressor>],
    extension: &str,
) -> Option<&'a dyn MeshDecompressor> {
    decompressors
        .iter()
        .find(|d| d.extension() == extension)
        .map(|d| d.as_ref())
}

/// Parse a loose `.gltf` or packed `.glb` asset.
///
/// Required compression extensions are accepted when a matching decompressor
/// is registered; any other validation failure is a parse error.
pub fn parse(bytes: &[u8], decompressors: &[Arc<dyn MeshDecompressor>]) -> Result<Gltf> {
    let gltf = Gltf::from_slice_without_validation(bytes).map_err(|e| Error::Parse(e.to_string()))?;

    let required: Vec<String> = gltf
        .document
        .extensions_required()
        .map(str::to_string)
        .collect();
    for extension in required.iter().filter(|e| is_compression(e)) {
        if find_decompressor(decompressors, extension).is_none() {
            return Err(Error::Decode(format!(
                "asset requires {} but no decoder is registered",
                extension
            )));
        }
    }

    let root = gltf.document.as_json();
    let mut problems = Vec::new();
    root.validate(root, gltf::json::Path::new, &mut |path: &dyn Fn() -> gltf::json::Path,
                                                      error: ValidationError| {
        let path = path();
        let handled = matches!(error, ValidationError::Unsupported)
            && path.as_str().starts_with("extensionsRequired")
            && required.iter().any(|e| is_compression(e));
        if !handled {
            problems.push(format!("{}: {}", path.as_str(), error));
        }
    });
    if !problems.is_empty() {
        return Err(Error::Parse(problems.join("; ")));
    }

    Ok(gltf)
}

/// Replace meshopt-compressed buffer views with their decoded bytes.
pub fn apply_meshopt(
    document: &gltf::Document,
    buffers: &mut [Vec<u8>],
    decompressors: &[Arc<dyn MeshDecompressor>],
) -> Result<()> {
    for view in document.views() {
        let Some(params) = view.extension_value(MESHOPT_EXTENSION) else {
            continue;
        };
        let decoder = find_decompressor(decompressors, MESHOPT_EXTENSION)
            .ok_or_else(|| Error::Decode(format!("no decoder registered for {}", MESHOPT_EXTENSION)))?;

        let field = |name: &str| params.get(name).and_then(serde_json::Value::as_u64).map(|v| v as usize);
        let source = field("buffer")
            .ok_or_else(|| Error::Decode(format!("buffer view {} has no source buffer", view.index())))?;
        let offset = field("byteOffset").unwrap_or(0);
        let length = field("byteLength").unwrap_or(0);
        let compressed = buffers
            .get(source)
            .and_then(|b| b.get(offset..offset + length))
            .ok_or_else(|| Error::Decode(format!("buffer view {} points outside its buffer", view.index())))?
            .to_vec();

        let Decoded::BufferView(bytes) = decoder.decode(&compressed, params)? else {
            return Err(Error::Decode(format!("{} decoder returned a mesh", MESHOPT_EXTENSION)));
        };

        let target = view.buffer().index();
        let range = view.offset()..view.offset() + view.length();
        let slot = buffers
            .get_mut(target)
            .and_then(|b| b.get_mut(range))
            .ok_or_else(|| Error::Decode(format!("buffer view {} has no room for decoded data", view.index())))?;
        if bytes.len() < slot.len() {
            return Err(Error::Decode(format!(
                "buffer view {} decoded to {} bytes, expected {}",
                view.index(),
                bytes.len(),
                slot.len()
            )));
        }
        slot.copy_from_slice(&bytes[..slot.len()]);
    }
    Ok(())
}

/// An image the loader managed to fetch and decode.
#[derive(Clone, Debug)]
pub struct ImageInfo {
    pub name: String,
    pub dimensions: (u32, u32),
}

/// Result of converting a glTF scene
#[derive(Debug)]
pub struct Imported {
    /// Group node holding the converted scene
    pub root: SceneNodeId,
    /// The asset brought its own lights
    pub has_lights: bool,
}

/// Everything the importer reads from.
pub struct ImportSource<'a> {
    pub document: &'a gltf::Document,
    pub buffers: &'a [Vec<u8>],
    /// Indexed like the document's images; `None` for images that failed
    pub images: &'a [Option<ImageInfo>],
    pub decompressors: &'a [Arc<dyn MeshDecompressor>],
}

/// Convert the default scene (or the first one) under `parent`.
///
/// On failure the partially built subtree is disposed before returning,
/// along with any geometry, material or texture not yet attached to it.
pub fn import_scene(source: &ImportSource<'_>, scene: &mut Scene, parent: SceneNodeId) -> Result<Imported> {
    let gltf_scene = source
        .document
        .default_scene()
        .or_else(|| source.document.scenes().next())
        .ok_or_else(|| Error::Load("no scene".into()))?;

    let name = gltf_scene.name().unwrap_or("scene").to_string();
    let root = scene.graph.add_child(parent, name, NodeContent::Group);

    let mut importer = Importer {
        source,
        scene,
        geometries: Vec::new(),
        materials: HashMap::new(),
        textures: HashMap::new(),
        has_lights: false,
    };
    let result = gltf_scene
        .nodes()
        .try_for_each(|node| importer.import_node(&node, root));
    let Importer {
        geometries,
        materials,
        textures,
        has_lights,
        ..
    } = importer;

    match result {
        Ok(()) => Ok(Imported { root, has_lights }),
        Err(e) => {
            let disposed = scene.dispose_subtree(root);
            let mut orphans = 0;
            for id in materials.into_values() {
                orphans += usize::from(scene.materials.remove(id).is_some());
            }
            for id in geometries {
                orphans += usize::from(scene.resources.dispose_geometry(id));
            }
            for id in textures.into_values().flatten() {
                orphans += usize::from(scene.resources.dispose_texture(id));
            }
            log::debug!(
                "Import failed, disposed {} partial nodes and {} detached resources",
                disposed.nodes,
                orphans
            );
            Err(e)
        }
    }
}

struct Importer<'s, 'a> {
    source: &'s ImportSource<'a>,
    scene: &'s mut Scene,
    /// Every geometry registered so far, attached or not
    geometries: Vec<GeometryId>,
    /// glTF material index (None = default material) → library id
    materials: HashMap<Option<usize>, MaterialId>,
    /// glTF image index → texture, None when the image is missing
    textures: HashMap<usize, Option<TextureId>>,
    has_lights: bool,
}

impl Importer<'_, '_> {
    fn import_node(&mut self, node: &gltf::Node<'_>, parent: SceneNodeId) -> Result<()> {
        let name = node.name().map(str::to_string).unwrap_or_else(|| format!("node_{}", node.index()));
        let (translation, rotation, scale) = node.transform().decomposed();
        let transform = LocalTransform {
            position: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation).normalize(),
            scale: Vec3::from_array(scale),
        };

        let mut primitives = Vec::new();
        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                if let Some(content) = self.import_primitive(&primitive)? {
                    primitives.push(content);
                }
            }
        }

        let content = if primitives.len() == 1 {
            primitives.remove(0)
        } else {
            NodeContent::Group
        };
        let id = self.scene.graph.add_child(parent, name.clone(), content);
        self.scene.graph.set_transform(id, transform);
        if let Some(graph_node) = self.scene.graph.get_mut(id) {
            graph_node.identifier = identifier(node).or(Some(name.clone()));
        }

        for (i, content) in primitives.into_iter().enumerate() {
            self.scene.graph.add_child(id, format!("{}_primitive_{}", name, i), content);
        }

        if let Some(light) = node.light() {
            self.has_lights = true;
            let kind = match light.kind() {
                GltfLightKind::Directional => LightKind::Directional,
                GltfLightKind::Point => LightKind::Point,
                GltfLightKind::Spot { .. } => LightKind::Spot,
            };
            let source = LightSource {
                kind,
                color: Vec3::from_array(light.color()),
                intensity: light.intensity(),
            };
            self.scene.graph.add_child(id, format!("{}_light", name), NodeContent::Light(source));
        }

        for child in node.children() {
            self.import_node(&child, id)?;
        }
        Ok(())
    }

    fn import_primitive(&mut self, primitive: &gltf::Primitive<'_>) -> Result<Option<NodeContent>> {
        if primitive.mode() != Mode::Triangles {
            log::debug!("Skipping primitive {} with mode {:?}", primitive.index(), primitive.mode());
            return Ok(None);
        }

        let draco = primitive
            .extension_value(DRACO_EXTENSION)
            .zip(find_decompressor(self.source.decompressors, DRACO_EXTENSION));
        let geometry = match draco {
            Some((params, decoder)) => self.decode_draco(params, decoder)?,
            None => {
                let buffers = self.source.buffers;
                let reader = primitive.reader(|b| buffers.get(b.index()).map(|data| data.as_slice()));
                let Some(positions) = reader.read_positions() else {
                    log::debug!("Skipping primitive {} without positions", primitive.index());
                    return Ok(None);
                };
                let positions: Vec<Vec3> = positions.map(Vec3::from_array).collect();
                let indices = reader.read_indices().map(|i| i.into_u32().collect());
                Geometry::new(positions, indices)
            }
        };

        let geometry = self.scene.resources.add_geometry(geometry);
        self.geometries.push(geometry);
        let material = self.material(&primitive.material());
        Ok(Some(NodeContent::Mesh { geometry, material }))
    }

    fn decode_draco(&self, params: &serde_json::Value, decoder: &dyn MeshDecompressor) -> Result<Geometry> {
        let view_index = params
            .get("bufferView")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| Error::Decode("draco primitive has no bufferView".into()))?;
        let view = self
            .source
            .document
            .views()
            .nth(view_index as usize)
            .ok_or_else(|| Error::Decode(format!("draco bufferView {} does not exist", view_index)))?;
        let bytes = self
            .source
            .buffers
            .get(view.buffer().index())
            .and_then(|b| b.get(view.offset()..view.offset() + view.length()))
            .ok_or_else(|| Error::Decode(format!("draco bufferView {} is out of range", view_index)))?;

        let attributes = params.get("attributes").unwrap_or(&serde_json::Value::Null);
        match decoder.decode(bytes, attributes)? {
            Decoded::Geometry(geometry) => Ok(geometry),
            Decoded::BufferView(_) => Err(Error::Decode(format!(
                "{} decoder returned raw bytes",
                DRACO_EXTENSION
            ))),
        }
    }

    fn material(&mut self, material: &gltf::Material<'_>) -> MaterialId {
        if let Some(id) = self.materials.get(&material.index()) {
            return *id;
        }

        let pbr = material.pbr_metallic_roughness();
        let mut converted = Material::new(material.name().unwrap_or("default"));
        converted.color = Vec4::from_array(pbr.base_color_factor());
        converted.transparent = material.alpha_mode() == AlphaMode::Blend;
        if material.alpha_mode() == AlphaMode::Mask {
            converted.alpha_test = material.alpha_cutoff().unwrap_or(0.5);
        }

        let slots = [
            (MapSlot::Map, pbr.base_color_texture().map(|t| t.texture())),
            (MapSlot::MetalnessMap, pbr.metallic_roughness_texture().map(|t| t.texture())),
            (MapSlot::RoughnessMap, pbr.metallic_roughness_texture().map(|t| t.texture())),
            (MapSlot::NormalMap, material.normal_texture().map(|t| t.texture())),
            (MapSlot::AoMap, material.occlusion_texture().map(|t| t.texture())),
            (MapSlot::EmissiveMap, material.emissive_texture().map(|t| t.texture())),
        ];
        for (slot, texture) in slots {
            if let Some(texture) = texture.and_then(|t| self.texture(t.source().index())) {
                converted.maps.insert(slot, texture);
            }
        }

        let id = self.scene.materials.add(converted);
        self.materials.insert(material.index(), id);
        id
    }

    fn texture(&mut self, image_index: usize) -> Option<TextureId> {
        if let Some(existing) = self.textures.get(&image_index) {
            return *existing;
        }
        let texture = self
            .source
            .images
            .get(image_index)
            .and_then(Option::as_ref)
            .map(|info| {
                self.scene.resources.add_texture(Texture {
                    name: info.name.clone(),
                    dimensions: Some(info.dimensions),
                    encoding: ColorEncoding::Linear,
                })
            });
        self.textures.insert(image_index, texture);
        texture
    }
}

/// `extras.id` of a node, as a string.
fn identifier(node: &gltf::Node<'_>) -> Option<String> {
    let raw = node.extras().as_ref()?;
    let extras: serde_json::Value = serde_json::from_str(raw.get()).ok()?;
    match extras.get("id")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::fixtures;

    fn import(json: &serde_json::Value, buffers: &[Vec<u8>]) -> Result<(Scene, Imported)> {
        let bytes = serde_json::to_vec(json).unwrap();
        let gltf = parse(&bytes, &[])?;
        let images = vec![None; gltf.document.images().count()];
        let source = ImportSource {
            document: &gltf.document,
            buffers,
            images: &images,
            decompressors: &[],
        };
        let mut scene = Scene::new();
        let root = scene.graph.root();
        let imported = import_scene(&source, &mut scene, root)?;
        Ok((scene, imported))
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse(b"not gltf", &[]), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_bad_index() {
        let mut json = fixtures::cube_gltf();
        json["scenes"][0]["nodes"] = serde_json::json!([7]);
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(matches!(parse(&bytes, &[]), Err(Error::Parse(_))));
    }

    #[test]
    fn test_no_scene_is_load_error() {
        let json = serde_json::json!({ "asset": { "version": "2.0" } });
        let err = import(&json, &[]).unwrap_err();
        assert!(matches!(err, Error::Load(ref m) if m == "no scene"));
    }

    #[test]
    fn test_import_cube() {
        let (positions, indices) = fixtures::cube_buffers();
        let (scene, imported) = import(&fixtures::cube_gltf(), &[positions, indices]).unwrap();

        let cube = scene.graph.find_by_name(imported.root, "Cube").unwrap();
        let node = scene.graph.get(cube).unwrap();
        assert_eq!(node.identifier.as_deref(), Some("cube-1"));
        let NodeContent::Mesh { geometry, material } = node.content else {
            panic!("cube should be a mesh");
        };
        let geometry = scene.resources.geometry(geometry).unwrap();
        assert_eq!(geometry.vertex_count(), 8);
        assert_eq!(geometry.triangle_count(), 12);

        // Image was missing, so the slot stays empty
        let material = scene.materials.get(material).unwrap();
        assert!(material.maps.is_empty());
        assert!(!imported.has_lights);
    }

    #[test]
    fn test_import_uses_default_scene() {
        let (positions, indices) = fixtures::cube_buffers();
        let mut json = fixtures::cube_gltf();
        json["scenes"] = serde_json::json!([{ "name": "empty", "nodes": [] }, { "name": "main", "nodes": [0] }]);
        json["scene"] = serde_json::json!(1);
        let (scene, imported) = import(&json, &[positions, indices]).unwrap();
        assert_eq!(scene.graph.get(imported.root).unwrap().name, "main");
    }

    #[test]
    fn test_identifier_falls_back_to_name() {
        let (positions, indices) = fixtures::cube_buffers();
        let mut json = fixtures::cube_gltf();
        json["nodes"][0].as_object_mut().unwrap().remove("extras");
        let (scene, imported) = import(&json, &[positions, indices]).unwrap();
        let cube = scene.graph.find_by_name(imported.root, "Cube").unwrap();
        assert_eq!(scene.graph.get(cube).unwrap().identifier.as_deref(), Some("Cube"));
    }

    #[test]
    fn test_lights_detected() {
        let (positions, indices) = fixtures::cube_buffers();
        let mut json = fixtures::cube_gltf();
        json["extensionsUsed"] = serde_json::json!(["KHR_lights_punctual"]);
        json["extensions"] = serde_json::json!({
            "KHR_lights_punctual": { "lights": [{ "type": "point", "color": [1.0, 0.5, 0.0], "intensity": 3.0 }] }
        });
        json["nodes"][0]["extensions"] = serde_json::json!({ "KHR_lights_punctual": { "light": 0 } });
        let (scene, imported) = import(&json, &[positions, indices]).unwrap();
        assert!(imported.has_lights);
        let light = scene.graph.find_by_name(imported.root, "Cube_light").unwrap();
        let NodeContent::Light(ref source) = scene.graph.get(light).unwrap().content else {
            panic!("expected light");
        };
        assert_eq!(source.kind, LightKind::Point);
        assert_eq!(source.intensity, 3.0);
    }

    #[test]
    fn test_required_draco_without_decoder() {
        let mut json = fixtures::cube_gltf();
        json["extensionsUsed"] = serde_json::json!([DRACO_EXTENSION]);
        json["extensionsRequired"] = serde_json::json!([DRACO_EXTENSION]);
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(matches!(parse(&bytes, &[]), Err(Error::Decode(_))));
    }

    struct FakeDraco;

    impl MeshDecompressor for FakeDraco {
        fn extension(&self) -> &str {
            DRACO_EXTENSION
        }

        fn decode(&self, bytes: &[u8], params: &serde_json::Value) -> Result<Decoded> {
            if params.get("POSITION").is_none() {
                return Err(Error::Decode("missing POSITION".into()));
            }
            // One triangle per compressed byte, enough to observe the call
            let positions = (0..bytes.len() * 3).map(|i| Vec3::splat(i as f32)).collect();
            Ok(Decoded::Geometry(Geometry::new(positions, None)))
        }
    }

    #[test]
    fn test_draco_primitive_goes_through_decoder() {
        let (positions, indices) = fixtures::cube_buffers();
        let mut json = fixtures::cube_gltf();
        json["extensionsUsed"] = serde_json::json!([DRACO_EXTENSION]);
        json["extensionsRequired"] = serde_json::json!([DRACO_EXTENSION]);
        json["meshes"][0]["primitives"][0]["extensions"] = serde_json::json!({
            DRACO_EXTENSION: { "bufferView": 1, "attributes": { "POSITION": 0 } }
        });
        let bytes = serde_json::to_vec(&json).unwrap();
        let decoders: Vec<Arc<dyn MeshDecompressor>> = vec![Arc::new(FakeDraco)];
        let gltf = parse(&bytes, &decoders).unwrap();

        let buffers = [positions, indices];
        let images = vec![None; 1];
        let source = ImportSource {
            document: &gltf.document,
            buffers: &buffers,
            images: &images,
            decompressors: &decoders,
        };
        let mut scene = Scene::new();
        let root = scene.graph.root();
        let imported = import_scene(&source, &mut scene, root).unwrap();

        let cube = scene.graph.find_by_name(imported.root, "Cube").unwrap();
        let NodeContent::Mesh { geometry, .. } = scene.graph.get(cube).unwrap().content else {
            panic!("expected mesh");
        };
        // Index view is 72 bytes long
        assert_eq!(scene.resources.geometry(geometry).unwrap().triangle_count(), 72);
    }

    #[test]
    fn test_failed_import_leaves_no_nodes() {
        let mut json = fixtures::cube_gltf();
        json["extensionsUsed"] = serde_json::json!([DRACO_EXTENSION]);
        json["extensionsRequired"] = serde_json::json!([DRACO_EXTENSION]);
        json["meshes"][0]["primitives"][0]["extensions"] = serde_json::json!({
            DRACO_EXTENSION: { "bufferView": 1, "attributes": {} }
        });
        let bytes = serde_json::to_vec(&json).unwrap();
        let decoders: Vec<Arc<dyn MeshDecompressor>> = vec![Arc::new(FakeDraco)];
        let gltf = parse(&bytes, &decoders).unwrap();
        let (positions, indices) = fixtures::cube_buffers();
        let buffers = [positions, indices];
        let images = vec![None; 1];
        let source = ImportSource {
            document: &gltf.document,
            buffers: &buffers,
            images: &images,
            decompressors: &decoders,
        };
        let mut scene = Scene::new();
        let root = scene.graph.root();

        assert!(matches!(import_scene(&source, &mut scene, root), Err(Error::Decode(_))));
        assert_eq!(scene.graph.node_count(), 1);
    }

    #[test]
    fn test_failed_primitive_releases_earlier_siblings() {
        let mut json = fixtures::cube_gltf();
        json["extensionsUsed"] = serde_json::json!([DRACO_EXTENSION]);
        json["extensionsRequired"] = serde_json::json!([DRACO_EXTENSION]);
        let mut compressed = json["meshes"][0]["primitives"][0].clone();
        compressed["extensions"] = serde_json::json!({
            DRACO_EXTENSION: { "bufferView": 1, "attributes": {} }
        });
        json["meshes"][0]["primitives"]
            .as_array_mut()
            .unwrap()
            .push(compressed);
        let bytes = serde_json::to_vec(&json).unwrap();
        let decoders: Vec<Arc<dyn MeshDecompressor>> = vec![Arc::new(FakeDraco)];
        let gltf = parse(&bytes, &decoders).unwrap();
        let (positions, indices) = fixtures::cube_buffers();
        let buffers = [positions, indices];
        let images = vec![None; 1];
        let source = ImportSource {
            document: &gltf.document,
            buffers: &buffers,
            images: &images,
            decompressors: &decoders,
        };
        let mut scene = Scene::new();
        let root = scene.graph.root();

        assert!(matches!(import_scene(&source, &mut scene, root), Err(Error::Decode(_))));
        assert_eq!(scene.graph.node_count(), 1);
        assert_eq!(scene.resources.live_geometry_count(), 0);
        assert!(scene.resources.is_geometry_disposed(GeometryId(0)));
        assert_eq!(scene.materials.len(), 0);
        assert_eq!(scene.resources.live_texture_count(), 0);
    }
}
