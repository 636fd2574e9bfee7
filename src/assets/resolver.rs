//! Reference resolution against the dropped bundle.
//!
//! A reference found inside an asset (a buffer or image URI) is mapped to a
//! bundle key; hits become transient locators, misses fall back to the
//! external reference `base_url + reference`.

use super::bundle::{normalize_key, AssetBundle};
use super::locator::{LoadScope, Locator};

/// Resolution step the loader calls for every reference it meets.
pub trait ResolveHook {
    fn resolve(&mut self, reference: &str, base_url: &str) -> Locator;
}

impl<F> ResolveHook for F
where
    F: FnMut(&str, &str) -> Locator,
{
    fn resolve(&mut self, reference: &str, base_url: &str) -> Locator {
        self(reference, base_url)
    }
}

/// Default hook: look references up in the bundle.
pub struct BundleResolver<'a> {
    bundle: &'a AssetBundle,
    root_path: &'a str,
    scope: &'a mut LoadScope,
}

impl<'a> BundleResolver<'a> {
    pub fn new(bundle: &'a AssetBundle, root_path: &'a str, scope: &'a mut LoadScope) -> Self {
        Self {
            bundle,
            root_path,
            scope,
        }
    }
}

impl ResolveHook for BundleResolver<'_> {
    fn resolve(&mut self, reference: &str, base_url: &str) -> Locator {
        resolve(reference, base_url, self.root_path, self.bundle, self.scope)
    }
}

/// Decode `%XX` escapes. Malformed escapes are kept as written; if the
/// decoded bytes are not UTF-8 the input is returned unchanged.
///
/// # Examples
/// ```
/// use dropview::assets::resolver::percent_decode;
///
/// assert_eq!(percent_decode("my%20model.bin"), "my model.bin");
/// assert_eq!(percent_decode("100%"), "100%");
/// ```
pub fn percent_decode(input: &str) -> String {
    fn hex(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}

/// Prefix of `url` up to and including the last `/`, or `""`.
///
/// # Examples
/// ```
/// use dropview::assets::resolver::extract_url_base;
///
/// assert_eq!(extract_url_base("blob:dropview/0"), "blob:dropview/");
/// assert_eq!(extract_url_base("scene.gltf"), "");
/// ```
pub fn extract_url_base(url: &str) -> &str {
    match url.rfind('/') {
        Some(i) => &url[..=i],
        None => "",
    }
}

/// Bundle key a reference maps to.
pub fn reference_key(reference: &str, base_url: &str, root_path: &str) -> String {
    let decoded = percent_decode(reference);
    let mut path = decoded.as_str();
    if !base_url.is_empty() {
        path = path.strip_prefix(base_url).unwrap_or(path);
    }
    path = path.strip_prefix("./").unwrap_or(path);
    normalize_key(&format!("{}{}", root_path, path))
}

/// Resolve one reference. Bundle hits mint a transient locator owned by
/// `scope`; `data:` URIs pass through as inline locators.
pub fn resolve(
    reference: &str,
    base_url: &str,
    root_path: &str,
    bundle: &AssetBundle,
    scope: &mut LoadScope,
) -> Locator {
    if reference.starts_with("data:") {
        return Locator::Inline(reference.to_string());
    }

    let key = reference_key(reference, base_url, root_path);
    match bundle.get(&key) {
        Some(bytes) => {
            let locator = scope.mint(bytes.clone());
            log::debug!("Resolved {} -> {} ({})", reference, locator, key);
            locator
        }
        None => {
            log::debug!("No bundle entry for {} (key {}), using external reference", reference, key);
            Locator::External(format!("{}{}", base_url, reference))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::locator::ObjectUrlRegistry;

    fn bundle_with(keys: &[&str]) -> AssetBundle {
        let mut bundle = AssetBundle::new();
        for (i, key) in keys.iter().enumerate() {
            bundle.insert(key, vec![i as u8]);
        }
        bundle
    }

    #[test]
    fn test_percent_decode_edge_cases() {
        assert_eq!(percent_decode("a%2Fb"), "a/b");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%4"), "%4");
        assert_eq!(percent_decode("%C3%A9t%C3%A9.png"), "été.png");
        // Lone continuation byte is not UTF-8
        assert_eq!(percent_decode("%80"), "%80");
    }

    #[test]
    fn test_reference_key_steps() {
        assert_eq!(reference_key("./tex/a%20b.png", "", "model/"), "model/tex/a b.png");
        assert_eq!(reference_key("blob:dropview/x/buf.bin", "blob:dropview/x/", ""), "buf.bin");
    }

    #[test]
    fn test_hit_mints_transient_locator() {
        let bundle = bundle_with(&["model/scene.gltf", "model/buf.bin"]);
        let registry = ObjectUrlRegistry::new();
        let mut scope = LoadScope::new(registry.clone());

        let locator = resolve("buf.bin", "blob:dropview/", "model/", &bundle, &mut scope);
        assert!(locator.is_transient());
        assert_eq!(&*registry.get(&locator).unwrap(), &[1u8]);
        assert_eq!(scope.pending(), 1);
    }

    #[test]
    fn test_miss_falls_back_to_external() {
        let bundle = bundle_with(&["scene.gltf"]);
        let mut scope = LoadScope::new(ObjectUrlRegistry::new());
        let locator = resolve("missing.bin", "http://host/", "", &bundle, &mut scope);
        assert_eq!(locator, Locator::External("http://host/missing.bin".into()));
        assert_eq!(scope.pending(), 0);
    }

    #[test]
    fn test_data_uri_passes_through() {
        let bundle = bundle_with(&[]);
        let mut scope = LoadScope::new(ObjectUrlRegistry::new());
        let uri = "data:application/octet-stream;base64,AAAA";
        assert_eq!(resolve(uri, "", "", &bundle, &mut scope), Locator::Inline(uri.into()));
    }

    #[test]
    fn test_resolution_ignores_insertion_order() {
        let registry = ObjectUrlRegistry::new();
        let mut scope = LoadScope::new(registry.clone());
        let mut forward = AssetBundle::new();
        let mut reverse = AssetBundle::new();
        let files = [("a/x.bin", 1u8), ("a/y.bin", 2u8), ("b/x.bin", 3u8)];
        for (key, byte) in files {
            forward.insert(key, vec![byte]);
        }
        for (key, byte) in files.iter().rev() {
            reverse.insert(key, vec![*byte]);
        }

        for reference in ["x.bin", "y.bin", "./x.bin"] {
            let a = resolve(reference, "", "a/", &forward, &mut scope);
            let b = resolve(reference, "", "a/", &reverse, &mut scope);
            assert_eq!(registry.get(&a), registry.get(&b));
        }
    }

    #[test]
    fn test_closure_hook() {
        let mut seen = Vec::new();
        let mut hook = |reference: &str, base: &str| {
            seen.push(reference.to_string());
            Locator::External(format!("{}{}", base, reference))
        };
        let locator = ResolveHook::resolve(&mut hook, "a.bin", "dir/");
        assert_eq!(locator.as_str(), "dir/a.bin");
        assert_eq!(seen, ["a.bin"]);
    }
}
