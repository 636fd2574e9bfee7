//! Error types for the viewer

use thiserror::Error;

/// Main error type for the viewer
#[derive(Debug, Error)]
pub enum Error {
    /// The entry asset parsed but holds nothing the viewer can show.
    #[error("Load error: {0}")]
    Load(String),

    /// Malformed asset content. Carries the raw parser message.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Compressed geometry could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A referenced file could not be fetched.
    #[error("Retrieval error for {locator}: {reason}")]
    Retrieval { locator: String, reason: String },

    /// A referenced image failed to load. Reported as a warning, never fatal.
    #[error("Missing texture: {0}")]
    MissingTexture(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a retrieval error for `locator`.
    pub fn retrieval(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Retrieval {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts a load. Missing textures only degrade it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::MissingTexture(_))
    }

    /// Message suitable for showing to the person who dropped the files.
    pub fn user_message(&self) -> String {
        match self {
            Error::Retrieval { .. } => {
                "Unable to retrieve this file. Check the network connection and that every referenced file was dropped.".to_string()
            }
            Error::Parse(message) => format!(
                "Unable to parse file content. Verify that this file is valid. Error: \"{}\"",
                message
            ),
            Error::MissingTexture(name) => format!("Missing texture: {}", name),
            Error::Load(message) | Error::Decode(message) | Error::Config(message) => message.clone(),
            Error::Io(e) => e.to_string(),
        }
    }
}
