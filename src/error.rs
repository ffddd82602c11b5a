//! Error types for the snapshot engine.

use crate::types::Hash;
use thiserror::Error;

/// Main error type for repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {hash} in object storage \"{kind}\"")]
    ObjectNotFound { kind: &'static str, hash: Hash },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported format version {found}, only {minimum} or higher is supported")]
    VersionTooOld { found: u32, minimum: u32 },

    #[error(
        "Future format version {found}, newest known is {newest}; \
         the repository was written by a newer version of worldvault"
    )]
    VersionTooNew { found: u32, newest: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Hash mismatch: expected {expected}, got {got}")]
    HashMismatch { expected: Hash, got: Hash },

    #[error("Tracked world not found: {0}")]
    WorldNotFound(String),

    #[error("Repository is locked by another process")]
    Locked,

    #[error("Repository not initialized")]
    NotInitialized,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for StoreError {
    fn from(e: hex::FromHexError) -> Self {
        StoreError::InvalidFormat(format!("invalid hex hash: {e}"))
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StoreError>;
