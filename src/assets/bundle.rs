//! In-memory collection of dropped files

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::core::error::Error;
use crate::core::types::Result;

/// Normalize a relative path into a bundle key: backslashes become `/`,
/// leading `./` and `/` are removed.
///
/// # Examples
/// ```
/// use dropview::assets::bundle::normalize_key;
///
/// assert_eq!(normalize_key("./models\\duck.gltf"), "models/duck.gltf");
/// assert_eq!(normalize_key("/textures/a.png"), "textures/a.png");
/// ```
pub fn normalize_key(path: &str) -> String {
    let mut key = path.replace('\\', "/");
    loop {
        if let Some(rest) = key.strip_prefix("./") {
            key = rest.to_string();
        } else if let Some(rest) = key.strip_prefix('/') {
            key = rest.to_string();
        } else {
            break;
        }
    }
    key
}

/// The asset to load out of a bundle, and the directory its references are
/// relative to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryAsset {
    pub key: String,
    /// Entry key with the file name removed; empty or ends with `/`
    pub root_path: String,
}

/// Relative path → file content. Keys are unique and normalized.
#[derive(Clone, Debug, Default)]
pub struct AssetBundle {
    entries: BTreeMap<String, Arc<[u8]>>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, replacing any previous content under the same key.
    pub fn insert(&mut self, path: &str, bytes: impl Into<Arc<[u8]>>) {
        self.entries.insert(normalize_key(path), bytes.into());
    }

    /// Look up by already-normalized key.
    pub fn get(&self, key: &str) -> Option<&Arc<[u8]>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick the scene asset: the last `.gltf`/`.glb` file in key order.
    pub fn find_entry(&self) -> Result<EntryAsset> {
        let key = self
            .entries
            .keys()
            .filter(|k| {
                let lower = k.to_ascii_lowercase();
                lower.ends_with(".gltf") || lower.ends_with(".glb")
            })
            .next_back()
            .ok_or_else(|| Error::Load("No .gltf or .glb asset found.".into()))?;

        let root_path = match key.rfind('/') {
            Some(i) => key[..=i].to_string(),
            None => String::new(),
        };
        Ok(EntryAsset {
            key: key.clone(),
            root_path,
        })
    }

    /// Add a file or a directory tree. Directory members are keyed relative
    /// to the directory itself; a plain file is keyed by its file name.
    pub fn add_path(&mut self, path: &Path) -> Result<usize> {
        if path.is_dir() {
            self.add_dir(path, path)
        } else {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.insert(&name, std::fs::read(path)?);
            Ok(1)
        }
    }

    fn add_dir(&mut self, base: &Path, dir: &Path) -> Result<usize> {
        let mut added = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                added += self.add_dir(base, &path)?;
            } else if let Ok(relative) = path.strip_prefix(base) {
                let key = relative.to_string_lossy();
                self.insert(&key, std::fs::read(&path)?);
                added += 1;
            }
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_normalized() {
        let mut bundle = AssetBundle::new();
        bundle.insert(".\\scene\\model.gltf", vec![1u8]);
        bundle.insert("//abs.bin", vec![2u8]);
        let keys: Vec<_> = bundle.keys().collect();
        assert_eq!(keys, ["abs.bin", "scene/model.gltf"]);
    }

    #[test]
    fn test_find_entry_in_subdirectory() {
        let mut bundle = AssetBundle::new();
        bundle.insert("duck/Duck.gltf", b"".to_vec());
        bundle.insert("duck/Duck0.bin", b"".to_vec());
        let entry = bundle.find_entry().unwrap();
        assert_eq!(entry.key, "duck/Duck.gltf");
        assert_eq!(entry.root_path, "duck/");
    }

    #[test]
    fn test_find_entry_takes_last_match() {
        let mut bundle = AssetBundle::new();
        bundle.insert("a.glb", b"".to_vec());
        bundle.insert("b.GLTF", b"".to_vec());
        let entry = bundle.find_entry().unwrap();
        assert_eq!(entry.key, "b.GLTF");
        assert_eq!(entry.root_path, "");
    }

    #[test]
    fn test_find_entry_missing() {
        let mut bundle = AssetBundle::new();
        bundle.insert("notes.txt", b"".to_vec());
        let err = bundle.find_entry().unwrap_err();
        assert_eq!(err.user_message(), "No .gltf or .glb asset found.");
    }

    #[test]
    fn test_add_path_directory_is_relative() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("textures")).unwrap();
        std::fs::write(dir.path().join("scene.gltf"), b"{}").unwrap();
        std::fs::write(dir.path().join("textures").join("a.png"), b"png").unwrap();

        let mut bundle = AssetBundle::new();
        assert_eq!(bundle.add_path(dir.path()).unwrap(), 2);
        assert!(bundle.contains("scene.gltf"));
        assert!(bundle.contains("textures/a.png"));
    }
}
