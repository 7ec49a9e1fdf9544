//! Storefront error types.

use thiserror::Error;

use crate::codec::ProtocolError;

/// Errors that can occur while driving the storefront page.
#[derive(Error, Debug)]
pub enum StorefrontError {
    /// A DOM operation failed.
    #[error("DOM error: {0}")]
    Dom(String),

    /// A required element is missing from the page.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The request could not be sent or its response could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The push channel sent something we could not decode.
    #[error("Push channel protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The push channel is not connected.
    #[error("Push channel not connected")]
    NotConnected,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorefrontError {
    fn from(e: serde_json::Error) -> Self {
        StorefrontError::Serialization(e.to_string())
    }
}
