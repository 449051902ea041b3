//! Domain model mirrored from the document store.
//!
//! # Responsibility
//! - Define identity, profile and catalog (topic/set/term) shapes.
//! - Convert between domain records and wire documents.
//!
//! # Invariants
//! - Wire field names follow the store schema (`name`, `starredSets`, ...).
//! - A set belongs to exactly one topic's `sets` list at a time.

pub mod catalog;
pub mod profile;

use crate::store::Document;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Encodes a record as a document field map.
pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Document, serde_json::Error> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(serde::ser::Error::custom("record must encode as an object")),
    }
}

/// Decodes a document field map into a record.
pub(crate) fn decode<T: DeserializeOwned>(fields: &Document) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(fields.clone()))
}
