//! Error types for the fixture store.

use thiserror::Error;

/// Main error type for fixture operations.
///
/// Expected no-op outcomes (duplicate insert, missing-key update or remove,
/// empty flush) are not errors; they surface as `None` / `0` results.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid registry format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Registry is locked by another process")]
    Locked,

    #[error("Identity strategy mismatch: expected {expected}, got {got}")]
    StrategyMismatch { expected: String, got: String },

    #[error("Collection error: {0}")]
    Collection(String),
}

impl From<serde_json::Error> for FixtureError {
    fn from(e: serde_json::Error) -> Self {
        FixtureError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for FixtureError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        FixtureError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for FixtureError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        FixtureError::Deserialization(e.to_string())
    }
}

/// Result type for fixture operations.
pub type Result<T> = std::result::Result<T, FixtureError>;
