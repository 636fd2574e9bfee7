//! Load orchestration: entry retrieval, reference resolution, content
//! retrieval, conversion and material post-processing.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use super::bundle::AssetBundle;
use super::gltf_import::{self, ImageInfo, ImportSource, MESHOPT_EXTENSION, MeshDecompressor};
use super::locator::{LoadScope, Locator, ObjectUrlRegistry};
use super::resolver::{extract_url_base, percent_decode, reference_key, BundleResolver, ResolveHook};
use super::retrieve::Retriever;
use super::sidecar::find_sidecar;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::scene::{ColorEncoding, MapSlot, Scene, SceneNodeId};

/// Alpha threshold applied to every content material.
pub const ALPHA_TEST: f32 = 0.5;

/// What a successful load hands to the viewer.
#[derive(Debug)]
pub struct LoadOutput {
    /// Group node holding the converted scene
    pub root: SceneNodeId,
    /// The asset brought its own lights
    pub has_lights: bool,
    /// Non-fatal problems, currently only missing textures
    pub warnings: Vec<Error>,
    /// Bundle entry that looks like sidecar metadata, with its bytes
    pub sidecar: Option<(String, Arc<[u8]>)>,
}

/// Turns an entry locator plus bundle into scene content.
pub struct SceneLoader {
    registry: ObjectUrlRegistry,
    retriever: Retriever,
    decompressors: Vec<Arc<dyn MeshDecompressor>>,
    hook: Option<Box<dyn ResolveHook + Send>>,
}

impl SceneLoader {
    pub fn new(registry: ObjectUrlRegistry, base_dir: Option<PathBuf>) -> Self {
        Self {
            retriever: Retriever::new(registry.clone(), base_dir),
            registry,
            decompressors: Vec::new(),
            hook: None,
        }
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    /// Register a decoder for a geometry compression extension. A later
    /// registration for the same extension replaces the earlier one.
    pub fn register_decompressor(&mut self, decompressor: Arc<dyn MeshDecompressor>) {
        self.decompressors
            .retain(|d| d.extension() != decompressor.extension());
        self.decompressors.push(decompressor);
    }

    /// Replace bundle lookup with a custom resolution step.
    pub fn set_resolve_hook(&mut self, hook: Box<dyn ResolveHook + Send>) {
        self.hook = Some(hook);
    }

    pub fn clear_resolve_hook(&mut self) {
        self.hook = None;
    }

    /// Load `entry` and attach the converted scene under `parent`.
    ///
    /// Transient locators minted while resolving belong to `scope`; the
    /// caller releases them. On error no content is left in `scene`.
    pub async fn load(
        &mut self,
        entry: &Locator,
        root_path: &str,
        bundle: &AssetBundle,
        scope: &mut LoadScope,
        scene: &mut Scene,
        parent: SceneNodeId,
    ) -> Result<LoadOutput> {
        let entry_bytes = self.retriever.retrieve(entry).await?;
        let gltf = gltf_import::parse(&entry_bytes, &self.decompressors)?;
        let document = &gltf.document;
        let base_url = extract_url_base(entry.as_str());
        log::info!("Parsed {} ({} bytes)", entry, entry_bytes.len());

        // Resolve every reference up front; retrieval happens afterwards
        let mut referenced = BTreeSet::new();
        let (buffer_locators, image_locators) = {
            let mut default_hook = BundleResolver::new(bundle, root_path, scope);
            let hook: &mut dyn ResolveHook = match self.hook.as_deref_mut() {
                Some(custom) => custom,
                None => &mut default_hook,
            };
            let mut resolve = |uri: &str| {
                if !uri.starts_with("data:") {
                    referenced.insert(reference_key(uri, base_url, root_path));
                }
                hook.resolve(uri, base_url)
            };

            let buffers: Vec<Option<Locator>> = document
                .buffers()
                .map(|buffer| match buffer.source() {
                    gltf::buffer::Source::Uri(uri) => Some(resolve(uri)),
                    gltf::buffer::Source::Bin => None,
                })
                .collect();
            let images: Vec<Option<Locator>> = document
                .images()
                .map(|image| match image.source() {
                    gltf::image::Source::Uri { uri, .. } => Some(resolve(uri)),
                    gltf::image::Source::View { .. } => None,
                })
                .collect();
            (buffers, images)
        };

        let mut buffers = Vec::with_capacity(buffer_locators.len());
        for (buffer, locator) in document.buffers().zip(&buffer_locators) {
            let data = match locator {
                Some(locator) => self.retriever.retrieve(locator).await?.to_vec(),
                None => match gltf.blob.as_deref() {
                    Some(blob) if buffer.index() == 0 => blob.to_vec(),
                    _ if is_meshopt_fallback(&buffer) => vec![0; buffer.length()],
                    _ => {
                        return Err(Error::Parse(format!(
                            "buffer {} has no uri and no binary chunk",
                            buffer.index()
                        )))
                    }
                },
            };
            if data.len() < buffer.length() {
                return Err(Error::Parse(format!(
                    "buffer {} is {} bytes, expected {}",
                    buffer.index(),
                    data.len(),
                    buffer.length()
                )));
            }
            buffers.push(data);
        }
        gltf_import::apply_meshopt(document, &mut buffers, &self.decompressors)?;

        let mut warnings = Vec::new();
        let mut images = Vec::with_capacity(image_locators.len());
        for (image, locator) in document.images().zip(&image_locators) {
            let name = image_name(&image);
            let bytes: Result<Arc<[u8]>> = match (locator, image.source()) {
                (Some(locator), _) => self.retriever.retrieve(locator).await,
                (None, gltf::image::Source::View { view, .. }) => buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(view.offset()..view.offset() + view.length()))
                    .map(Arc::from)
                    .ok_or_else(|| Error::Parse(format!("image {} view is out of range", image.index()))),
                (None, gltf::image::Source::Uri { .. }) => Err(Error::Load("unresolved image".into())),
            };
            let info = bytes.and_then(|bytes| {
                image::load_from_memory(&bytes)
                    .map(|decoded| ImageInfo {
                        name: name.clone(),
                        dimensions: (decoded.width(), decoded.height()),
                    })
                    .map_err(|e| Error::Decode(e.to_string()))
            });
            match info {
                Ok(info) => images.push(Some(info)),
                Err(e) => {
                    log::warn!("Missing texture {}: {}", name, e);
                    warnings.push(Error::MissingTexture(name));
                    images.push(None);
                }
            }
        }

        let source = ImportSource {
            document,
            buffers: &buffers,
            images: &images,
            decompressors: &self.decompressors,
        };
        let imported = gltf_import::import_scene(&source, scene, parent)?;
        post_process(scene, imported.root);

        let entry_key = bundle
            .keys()
            .find(|key| bundle.get(key).is_some_and(|bytes| Arc::ptr_eq(bytes, &entry_bytes)))
            .map(str::to_string);
        let sidecar = find_sidecar(bundle, entry_key.as_deref(), &referenced)
            .and_then(|key| bundle.get(&key).cloned().map(|bytes| (key, bytes)));

        Ok(LoadOutput {
            root: imported.root,
            has_lights: imported.has_lights,
            warnings,
            sidecar,
        })
    }
}

fn is_meshopt_fallback(buffer: &gltf::Buffer<'_>) -> bool {
    buffer
        .extension_value(MESHOPT_EXTENSION)
        .and_then(|ext| ext.get("fallback"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// File name an image is reported under.
fn image_name(image: &gltf::Image<'_>) -> String {
    match image.source() {
        gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
            let decoded = percent_decode(uri);
            decoded.rsplit('/').next().unwrap_or(&decoded).to_string()
        }
        _ => image
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("image_{}", image.index())),
    }
}

/// Material fix-ups applied to freshly loaded content: depth writes only for
/// opaque materials, alpha testing, and sRGB tagging of color textures.
pub fn post_process(scene: &mut Scene, root: SceneNodeId) {
    for id in scene.materials_in(root) {
        let Some(material) = scene.materials.get_mut(id) else {
            continue;
        };
        material.depth_write = !material.transparent;
        material.alpha_test = ALPHA_TEST;

        let mut tagged = false;
        for slot in MapSlot::ALL.into_iter().filter(|s| s.carries_color()) {
            if let Some(texture) = material.maps.get(&slot).copied() {
                if let Some(texture) = scene.resources.texture_mut(texture) {
                    texture.encoding = ColorEncoding::Srgb;
                }
                tagged = true;
            }
        }
        if tagged {
            material.needs_update = true;
        }
    }
}
