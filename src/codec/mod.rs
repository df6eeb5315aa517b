//! Blob encoding for the index and for individual records.
//!
//! Encoding is infallible for well-formed values apart from serializer
//! failures. Decoding never panics: anything that does not validate becomes a
//! [`DecodeError`] so the caller can decide whether to skip or abort.
//!
//! Both formats decode through a self-describing intermediate value, which
//! lets numeric fields be range-checked explicitly instead of trusting the
//! serializer's coercions.

mod wire;

use crate::error::{DecodeError, Result};
use crate::types::{Record, RecordId};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

/// Wire format for stored blobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// UTF-8 JSON, readable by any client of the shared store.
    #[default]
    Json,
    /// MessagePack with named fields.
    MessagePack,
}

/// Encoder/decoder bound to one wire format.
#[derive(Clone, Copy, Debug, Default)]
pub struct Codec {
    format: Format,
}

impl Codec {
    pub fn new(format: Format) -> Self {
        Self { format }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn encode_index(&self, ids: &[RecordId]) -> Result<Vec<u8>> {
        let names: Vec<&str> = ids.iter().map(RecordId::as_str).collect();
        self.encode(&names)
    }

    /// Decode an index blob. Repeated identifiers keep their first position.
    pub fn decode_index(&self, bytes: &[u8]) -> std::result::Result<Vec<RecordId>, DecodeError> {
        let value = self.decode_value(bytes)?;
        let items = value
            .as_array()
            .ok_or_else(|| DecodeError::Malformed("index is not a list".into()))?;

        let mut seen = HashSet::with_capacity(items.len());
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let s = item
                .as_str()
                .ok_or_else(|| DecodeError::invalid("index", "entry is not a string"))?;
            let id = RecordId::parse(s).map_err(|e| DecodeError::invalid("index", e.to_string()))?;
            if seen.insert(id.clone()) {
                ids.push(id);
            } else {
                tracing::warn!(record = %id, "duplicate identifier in index, keeping first");
            }
        }
        Ok(ids)
    }

    pub fn encode_record(&self, record: &Record) -> Result<Vec<u8>> {
        self.encode(&wire::RecordWire::from(record))
    }

    pub fn decode_record(&self, bytes: &[u8]) -> std::result::Result<Record, DecodeError> {
        let value = self.decode_value(bytes)?;
        wire::record_from_value(&value)
    }

    fn encode<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(match self.format {
            Format::Json => serde_json::to_vec(value)?,
            Format::MessagePack => rmp_serde::to_vec_named(value)?,
        })
    }

    fn decode_value(&self, bytes: &[u8]) -> std::result::Result<Value, DecodeError> {
        Ok(match self.format {
            Format::Json => serde_json::from_slice(bytes)?,
            Format::MessagePack => rmp_serde::from_slice(bytes)?,
        })
    }
}
