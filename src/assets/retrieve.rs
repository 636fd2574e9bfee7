//! Fetching the bytes behind a locator

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::locator::{Locator, ObjectUrlRegistry};
use super::resolver::percent_decode;
use crate::core::error::Error;
use crate::core::types::Result;

/// Decode the payload of a `data:` URI. Base64 payloads are decoded, plain
/// ones are percent-decoded.
///
/// # Examples
/// ```
/// use dropview::assets::retrieve::decode_data_uri;
///
/// assert_eq!(decode_data_uri("data:;base64,AQID").unwrap(), vec![1, 2, 3]);
/// assert_eq!(decode_data_uri("data:text/plain,a%20b").unwrap(), b"a b".to_vec());
/// ```
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let body = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::retrieval(uri, "not a data URI"))?;
    let (header, payload) = body
        .split_once(',')
        .ok_or_else(|| Error::retrieval(uri, "data URI has no payload"))?;

    if header.ends_with(";base64") {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::retrieval(uri, format!("invalid base64: {}", e)))
    } else {
        Ok(percent_decode(payload).into_bytes())
    }
}

/// Fetches content for transient, inline and external locators.
#[derive(Clone)]
pub struct Retriever {
    registry: ObjectUrlRegistry,
    base_dir: Option<PathBuf>,
}

impl Retriever {
    /// External references are read relative to `base_dir`, or to the
    /// working directory when it is `None`.
    pub fn new(registry: ObjectUrlRegistry, base_dir: Option<PathBuf>) -> Self {
        Self { registry, base_dir }
    }

    pub async fn retrieve(&self, locator: &Locator) -> Result<Arc<[u8]>> {
        match locator {
            Locator::Transient(_) => self
                .registry
                .get(locator)
                .ok_or_else(|| Error::retrieval(locator.to_string(), "locator is not live")),
            Locator::Inline(uri) => decode_data_uri(uri).map(Arc::from),
            Locator::External(reference) => {
                if reference.contains("://") || reference.starts_with("blob:") {
                    return Err(Error::retrieval(reference.as_str(), "not available offline"));
                }
                let relative = percent_decode(reference);
                let path = match &self.base_dir {
                    Some(dir) => dir.join(&relative),
                    None => PathBuf::from(&relative),
                };
                log::debug!("Reading external reference {}", path.display());
                tokio::fs::read(&path)
                    .await
                    .map(Arc::from)
                    .map_err(|e| Error::retrieval(reference.as_str(), e.to_string()))
            }
        }
    }
}
