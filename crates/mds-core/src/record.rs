use crate::field_path::FieldPath;
use crate::stable_json::stable_json_text;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SENTINEL: &str = "N/A";
pub const DOCUMENT_ID_FIELD: &str = "_id";
pub const MISSING_DOCUMENT_MARKER: &str = "Document missing";

/// Top-level JSON shape of a fetched catalog payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    Sequence,
    Mapping,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecords {
    pub shape: PayloadShape,
    pub records: Vec<Value>,
}

impl CatalogRecords {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Sequences are taken as-is; mapping values become the records and their keys are
/// dropped. Every other shape yields no records.
pub fn records_from_payload(payload: Value) -> CatalogRecords {
    match payload {
        Value::Array(records) => CatalogRecords {
            shape: PayloadShape::Sequence,
            records,
        },
        Value::Object(entries) => CatalogRecords {
            shape: PayloadShape::Mapping,
            records: entries.into_iter().map(|(_, record)| record).collect(),
        },
        _ => CatalogRecords {
            shape: PayloadShape::Unsupported,
            records: Vec::new(),
        },
    }
}

pub fn document_id(document: &Value) -> Option<&Value> {
    document.as_object().and_then(|object| object.get(DOCUMENT_ID_FIELD))
}

/// Store-generated ids arrive as extended JSON (`{"$oid": "..."}`) and render as the bare hex.
pub fn render_document_id(id: &Value) -> String {
    if let Some(oid) = id
        .as_object()
        .filter(|object| object.len() == 1)
        .and_then(|object| object.get("$oid"))
        .and_then(Value::as_str)
    {
        return oid.to_string();
    }
    render_value(id)
}

pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => stable_json_text(other),
    }
}

pub fn secondary_id(document: &Value, path: &FieldPath) -> String {
    path.lookup(document)
        .map(render_value)
        .unwrap_or_else(|| SENTINEL.to_string())
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
