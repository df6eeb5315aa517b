//! Error types for the registry.

use crate::types::RecordId;
use thiserror::Error;

/// Why a stored blob could not be turned back into an index or a record.
///
/// Kept separate from [`SyncError`] so callers can tell a malformed blob
/// apart from an absent key or an unreachable store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed blob: {0}")]
    Malformed(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("record key holds {found}, expected {expected}")]
    IdentifierMismatch { expected: RecordId, found: RecordId },

    #[error("invalid blob file: {0}")]
    InvalidFormat(String),

    #[error("checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },
}

impl DecodeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Main error type for registry operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("identifier collision: {0} is already in use")]
    IdentifierCollision(RecordId),

    #[error("record {id} was stored but could not be indexed: {cause}")]
    OrphanWrite { id: RecordId, cause: String },

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("key is {len} bytes, store accepts at most {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("no producer identity is connected")]
    NoIdentity,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether retrying the whole operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::StoreUnavailable(_))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for SyncError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for DecodeError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, SyncError>;
