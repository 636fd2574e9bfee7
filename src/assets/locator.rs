//! Locators and the registry of transient in-memory ones.
//!
//! A transient locator (`blob:dropview/<n>`) names bytes held by an
//! [`ObjectUrlRegistry`] until it is revoked. Every locator minted during a
//! load belongs to that load's [`LoadScope`], which revokes them all exactly
//! once on whichever path the load leaves by.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

const TRANSIENT_PREFIX: &str = "blob:dropview/";

/// Where a piece of content can be fetched from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Bytes held by an [`ObjectUrlRegistry`]
    Transient(String),
    /// Base64 `data:` URI
    Inline(String),
    /// Anything else: a path or URL outside the bundle
    External(String),
}

impl Locator {
    pub fn parse(s: &str) -> Self {
        if s.starts_with(TRANSIENT_PREFIX) {
            Locator::Transient(s.to_string())
        } else if s.starts_with("data:") {
            Locator::Inline(s.to_string())
        } else {
            Locator::External(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locator::Transient(s) | Locator::Inline(s) | Locator::External(s) => s,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Locator::Transient(_))
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Inline payloads can be megabytes long
        match self {
            Locator::Inline(s) => match s.char_indices().nth(64) {
                Some((cut, _)) => write!(f, "{}...", &s[..cut]),
                None => f.write_str(s),
            },
            _ => f.write_str(self.as_str()),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    next: u64,
    live: HashMap<String, Arc<[u8]>>,
}

/// Shared table of transient locators. Clones refer to the same table.
#[derive(Clone, Default)]
pub struct ObjectUrlRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mint a new transient locator for `bytes`.
    pub fn create(&self, bytes: Arc<[u8]>) -> Locator {
        let mut inner = self.lock();
        let url = format!("{}{}", TRANSIENT_PREFIX, inner.next);
        inner.next += 1;
        inner.live.insert(url.clone(), bytes);
        Locator::Transient(url)
    }

    pub fn get(&self, locator: &Locator) -> Option<Arc<[u8]>> {
        match locator {
            Locator::Transient(url) => self.lock().live.get(url).cloned(),
            _ => None,
        }
    }

    /// Release the bytes. Returns `false` if the locator was not live.
    pub fn revoke(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Transient(url) => self.lock().live.remove(url).is_some(),
            _ => false,
        }
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }
}

/// Transient locators minted on behalf of one load.
pub struct LoadScope {
    registry: ObjectUrlRegistry,
    minted: Vec<Locator>,
}

impl LoadScope {
    pub fn new(registry: ObjectUrlRegistry) -> Self {
        Self {
            registry,
            minted: Vec::new(),
        }
    }

    /// Mint a locator owned by this scope.
    pub fn mint(&mut self, bytes: Arc<[u8]>) -> Locator {
        let locator = self.registry.create(bytes);
        self.minted.push(locator.clone());
        locator
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    /// Locators minted and not yet released.
    pub fn pending(&self) -> usize {
        self.minted.len()
    }

    /// Revoke everything minted so far. Returns the number revoked.
    pub fn release(&mut self) -> usize {
        let mut revoked = 0;
        for locator in self.minted.drain(..) {
            if self.registry.revoke(&locator) {
                revoked += 1;
            }
        }
        if revoked > 0 {
            log::debug!("Revoked {} transient locators", revoked);
        }
        revoked
    }
}

impl Drop for LoadScope {
    fn drop(&mut self) {
        self.release();
    }
}
