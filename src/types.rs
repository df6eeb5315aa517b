//! Core types for the registry.

use crate::error::{Result, SyncError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storage-key suffix reserved for the index.
pub(crate) const INDEX_SUFFIX: &str = "keys";

/// Characters used for the random part of generated identifiers.
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random part of generated identifiers.
const ID_RANDOM_LEN: usize = 7;

/// Unique identifier for a record, chosen by the submitting client.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Parse an identifier received from the store or a caller.
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty()
            || s == INDEX_SUFFIX
            || s.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(SyncError::InvalidIdentifier(s));
        }
        Ok(RecordId(s))
    }

    /// Build a fresh identifier from wall-clock milliseconds and a random
    /// base-36 suffix, e.g. `1718000000000-k3j9x0a`.
    pub fn generate<R: Rng>(unix_millis: u64, rng: &mut R) -> Self {
        let suffix: String = (0..ID_RANDOM_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        RecordId(format!("{}-{}", unix_millis, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = SyncError;

    fn try_from(s: String) -> Result<Self> {
        RecordId::parse(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seconds since Unix epoch, assigned by the producer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Identity of the client that produced a record.
///
/// Equality is exact; use [`Owner::matches`] for the case-insensitive
/// comparison that address-like identities need.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Owner(String);

impl Owner {
    pub fn new(s: impl Into<String>) -> Self {
        Owner(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ASCII case-insensitive comparison (`0xAbC` matches `0xabc`).
    pub fn matches(&self, other: &Owner) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emotional intensity on a 1..=10 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Returns `None` outside `MIN..=MAX`.
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Intensity(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Unencrypted fields kept beside the payload for display and filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub emotion: String,
    pub intensity: Intensity,
}

impl Classification {
    pub fn new(emotion: impl Into<String>, intensity: u8) -> Result<Self> {
        let emotion = emotion.into();
        if emotion.trim().is_empty() {
            return Err(SyncError::InvalidRecord("emotion must not be empty".into()));
        }
        let intensity = Intensity::new(intensity).ok_or_else(|| {
            SyncError::InvalidRecord(format!(
                "intensity {} outside {}..={}",
                intensity,
                Intensity::MIN,
                Intensity::MAX
            ))
        })?;
        Ok(Self { emotion, intensity })
    }
}

/// A single stored record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Identifier (also the storage-key suffix).
    pub id: RecordId,

    /// Encrypted payload, opaque to this crate.
    pub payload: Vec<u8>,

    /// When the producer created the record.
    pub timestamp: Timestamp,

    /// Who produced it.
    pub owner: Owner,

    pub classification: Classification,
}

/// Caller input for a new record, before encryption and id assignment.
#[derive(Clone, Debug)]
pub struct RecordDraft {
    pub plaintext: Vec<u8>,
    pub classification: Classification,
}

impl RecordDraft {
    pub fn new(plaintext: impl Into<Vec<u8>>, classification: Classification) -> Self {
        Self {
            plaintext: plaintext.into(),
            classification,
        }
    }

    /// Check the draft before anything touches the store.
    pub fn validate(&self) -> Result<()> {
        if self.plaintext.is_empty() {
            return Err(SyncError::InvalidRecord("payload must not be empty".into()));
        }
        if self.classification.emotion.trim().is_empty() {
            return Err(SyncError::InvalidRecord("emotion must not be empty".into()));
        }
        Ok(())
    }
}

/// Aggregate view over a set of records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordStats {
    pub total: usize,

    /// Mean intensity, `None` when there are no records.
    pub average_intensity: Option<f64>,

    pub emotion_counts: BTreeMap<String, usize>,
}

impl RecordStats {
    pub fn from_records(records: &[Record]) -> Self {
        let mut emotion_counts = BTreeMap::new();
        let mut intensity_sum = 0u64;

        for record in records {
            *emotion_counts
                .entry(record.classification.emotion.clone())
                .or_insert(0) += 1;
            intensity_sum += u64::from(record.classification.intensity.get());
        }

        let average_intensity = if records.is_empty() {
            None
        } else {
            Some(intensity_sum as f64 / records.len() as f64)
        };

        Self {
            total: records.len(),
            average_intensity,
            emotion_counts,
        }
    }
}

/// Tri-state outcome a UI can render directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationStatus {
    Pending(String),
    Success(String),
    Error(String),
}

impl OperationStatus {
    /// Map any operation result onto success or error.
    pub fn from_result<T>(result: &Result<T>, success: impl Into<String>) -> Self {
        match result {
            Ok(_) => OperationStatus::Success(success.into()),
            Err(e) => OperationStatus::Error(e.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OperationStatus::Pending(_))
    }

    pub fn message(&self) -> &str {
        match self {
            OperationStatus::Pending(m) | OperationStatus::Success(m) | OperationStatus::Error(m) => m,
        }
    }
}
