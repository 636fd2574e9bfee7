//! Sidecar metadata: a JSON file dropped next to the asset, keyed by object
//! identifier. Decoded off the load path and attached when ready.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use super::bundle::AssetBundle;
use crate::core::error::Error;
use crate::core::types::Result;

/// Identifier → metadata record
#[derive(Clone, Debug, Default)]
pub struct SidecarMetadata {
    entries: HashMap<String, Value>,
}

impl SidecarMetadata {
    /// Accepts an array of objects carrying `id_field`, or an object keyed
    /// by identifier. Array items without an identifier are skipped.
    pub fn from_slice(bytes: &[u8], id_field: &str) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::Parse(e.to_string()))?;
        let entries = match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| {
                    let id = match item.get(id_field)? {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        _ => return None,
                    };
                    Some((id, item))
                })
                .collect(),
            Value::Object(map) => map.into_iter().collect(),
            _ => return Err(Error::Parse("metadata must be a JSON array or object".into())),
        };
        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The single bundle entry that is neither the entry asset nor referenced by
/// it, if there is exactly one.
pub fn find_sidecar(bundle: &AssetBundle, entry_key: Option<&str>, referenced: &BTreeSet<String>) -> Option<String> {
    let mut candidates = bundle.keys().filter(|key| {
        let lower = key.to_ascii_lowercase();
        Some(*key) != entry_key
            && !referenced.contains(*key)
            && !lower.ends_with(".gltf")
            && !lower.ends_with(".glb")
    });
    let first = candidates.next()?;
    match candidates.next() {
        None => Some(first.to_string()),
        Some(_) => None,
    }
}

/// Viewer-side holder for metadata that may still be decoding.
#[derive(Default)]
pub enum MetadataSlot {
    #[default]
    Empty,
    Pending(oneshot::Receiver<Result<SidecarMetadata>>),
    Ready(Arc<SidecarMetadata>),
    Failed,
}

impl MetadataSlot {
    /// Start decoding `bytes`. Runs on the blocking pool when a tokio runtime
    /// is available, inline otherwise.
    pub fn decode(bytes: Arc<[u8]>, id_field: String) -> Self {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let (tx, rx) = oneshot::channel();
                handle.spawn_blocking(move || {
                    let _ = tx.send(SidecarMetadata::from_slice(&bytes, &id_field));
                });
                MetadataSlot::Pending(rx)
            }
            Err(_) => Self::settle(SidecarMetadata::from_slice(&bytes, &id_field)),
        }
    }

    fn settle(result: Result<SidecarMetadata>) -> Self {
        match result {
            Ok(metadata) => {
                log::info!("Attached metadata for {} objects", metadata.len());
                MetadataSlot::Ready(Arc::new(metadata))
            }
            Err(e) => {
                log::warn!("Ignoring metadata file: {}", e);
                MetadataSlot::Failed
            }
        }
    }

    /// Pick up a finished decode without blocking.
    pub fn poll(&mut self) -> Option<&SidecarMetadata> {
        if let MetadataSlot::Pending(rx) = self {
            match rx.try_recv() {
                Ok(result) => *self = Self::settle(result),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    log::warn!("Metadata decode task ended without a result");
                    *self = MetadataSlot::Failed;
                }
            }
        }
        self.get()
    }

    pub fn get(&self) -> Option<&SidecarMetadata> {
        match self {
            MetadataSlot::Ready(metadata) => Some(metadata),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MetadataSlot::Pending(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_array_form() {
        let json = br#"[{ "id": "a", "area": 12 }, { "id": 7 }, { "name": "no id" }]"#;
        let metadata = SidecarMetadata::from_slice(json, "id").unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("a").unwrap()["area"], 12);
        assert!(metadata.get("7").is_some());
    }

    #[test]
    fn test_object_form_and_custom_field() {
        let metadata = SidecarMetadata::from_slice(br#"{ "wall-1": { "kind": "wall" } }"#, "guid").unwrap();
        assert_eq!(metadata.get("wall-1").unwrap()["kind"], "wall");

        let metadata = SidecarMetadata::from_slice(br#"[{ "guid": "x" }]"#, "guid").unwrap();
        assert!(metadata.get("x").is_some());
    }

    #[test]
    fn test_invalid_is_parse_error() {
        assert!(matches!(SidecarMetadata::from_slice(b"42", "id"), Err(Error::Parse(_))));
        assert!(matches!(SidecarMetadata::from_slice(b"{", "id"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_find_sidecar_requires_exactly_one() {
        let mut bundle = AssetBundle::new();
        for key in ["scene.gltf", "buf.bin", "meta.json"] {
            bundle.insert(key, b"".to_vec());
        }
        let referenced: BTreeSet<String> = ["buf.bin".to_string()].into();
        assert_eq!(find_sidecar(&bundle, Some("scene.gltf"), &referenced), Some("meta.json".into()));

        bundle.insert("notes.txt", b"".to_vec());
        assert_eq!(find_sidecar(&bundle, Some("scene.gltf"), &referenced), None);

        let mut bare = AssetBundle::new();
        bare.insert("scene.gltf", b"".to_vec());
        assert_eq!(find_sidecar(&bare, None, &BTreeSet::new()), None);
    }

    #[test]
    fn test_decode_without_runtime_is_inline() {
        let slot = MetadataSlot::decode(Arc::from(&br#"[{ "id": "a" }]"#[..]), "id".into());
        assert!(slot.get().is_some());

        let slot = MetadataSlot::decode(Arc::from(&b"oops"[..]), "id".into());
        assert!(matches!(slot, MetadataSlot::Failed));
    }

    #[tokio::test]
    async fn test_decode_on_runtime_completes() {
        let mut slot = MetadataSlot::decode(Arc::from(&br#"{ "a": {} }"#[..]), "id".into());
        for _ in 0..200 {
            if slot.poll().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(slot.get().unwrap().get("a").is_some());
        assert!(!slot.is_pending());
    }
}
