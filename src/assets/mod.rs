//! Asset intake: dropped-file bundles, locators, reference resolution,
//! retrieval and glTF conversion.

pub mod bundle;
pub mod gltf_import;
pub mod loader;
pub mod locator;
pub mod resolver;
pub mod retrieve;
pub mod sidecar;

#[cfg(test)]
pub(crate) mod fixtures;

pub use bundle::{AssetBundle, EntryAsset};
pub use gltf_import::{Decoded, MeshDecompressor};
pub use loader::{LoadOutput, SceneLoader};
pub use locator::{LoadScope, Locator, ObjectUrlRegistry};
pub use resolver::{extract_url_base, resolve, BundleResolver, ResolveHook};
pub use retrieve::Retriever;
pub use sidecar::{MetadataSlot, SidecarMetadata};
