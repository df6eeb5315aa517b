//! Record wire layout.

use crate::error::DecodeError;
use crate::types::{Classification, Intensity, Owner, Record, RecordId, Timestamp};
use serde::Serialize;
use serde_json::{Map, Value};

/// Field set written for every record, in either format.
#[derive(Serialize)]
pub(super) struct RecordWire<'a> {
    id: &'a str,
    /// Hex-encoded payload.
    data: String,
    timestamp: u64,
    owner: &'a str,
    emotion: &'a str,
    intensity: u8,
}

impl<'a> From<&'a Record> for RecordWire<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            id: record.id.as_str(),
            data: hex::encode(&record.payload),
            timestamp: record.timestamp.0,
            owner: record.owner.as_str(),
            emotion: &record.classification.emotion,
            intensity: record.classification.intensity.get(),
        }
    }
}

pub(super) fn record_from_value(value: &Value) -> Result<Record, DecodeError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("record is not an object".into()))?;

    let id = RecordId::parse(str_field(obj, "id")?)
        .map_err(|e| DecodeError::invalid("id", e.to_string()))?;

    let payload = hex::decode(str_field(obj, "data")?)
        .map_err(|e| DecodeError::invalid("data", e.to_string()))?;

    let timestamp = Timestamp(uint_field(obj, "timestamp")?);

    let owner = Owner::new(str_field(obj, "owner")?);

    let emotion = str_field(obj, "emotion")?;
    if emotion.trim().is_empty() {
        return Err(DecodeError::invalid("emotion", "must not be empty"));
    }

    let raw_intensity = uint_field(obj, "intensity")?;
    let intensity = u8::try_from(raw_intensity)
        .ok()
        .and_then(Intensity::new)
        .ok_or_else(|| {
            DecodeError::invalid(
                "intensity",
                format!(
                    "{} outside {}..={}",
                    raw_intensity,
                    Intensity::MIN,
                    Intensity::MAX
                ),
            )
        })?;

    Ok(Record {
        id,
        payload,
        timestamp,
        owner,
        classification: Classification {
            emotion: emotion.to_string(),
            intensity,
        },
    })
}

fn field<'v>(obj: &'v Map<String, Value>, name: &'static str) -> Result<&'v Value, DecodeError> {
    obj.get(name).ok_or(DecodeError::MissingField(name))
}

fn str_field<'v>(obj: &'v Map<String, Value>, name: &'static str) -> Result<&'v str, DecodeError> {
    field(obj, name)?
        .as_str()
        .ok_or_else(|| DecodeError::invalid(name, "expected a string"))
}

fn uint_field(obj: &Map<String, Value>, name: &'static str) -> Result<u64, DecodeError> {
    let value = field(obj, name)?;
    if !value.is_number() {
        return Err(DecodeError::invalid(name, format!("expected a number, got {}", value)));
    }
    value
        .as_u64()
        .ok_or_else(|| DecodeError::invalid(name, format!("{} is not a non-negative integer", value)))
}
