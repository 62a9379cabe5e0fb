use crate::document_diff::{ChangeKind, DiffResult};
use mds_core::{render_value, MISSING_DOCUMENT_MARKER, SENTINEL};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRecordKind {
    Changed,
    TypeChanged,
    Added,
    Removed,
    DocumentMissing,
}

impl From<ChangeKind> for ChangeRecordKind {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Changed => ChangeRecordKind::Changed,
            ChangeKind::TypeChanged => ChangeRecordKind::TypeChanged,
            ChangeKind::Added => ChangeRecordKind::Added,
            ChangeKind::Removed => ChangeRecordKind::Removed,
        }
    }
}

/// One row of the change report. `kind` and `path` are kept for callers; the CSV
/// only carries the six report columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub collection_before: String,
    pub collection_after: String,
    pub doc_id: String,
    pub appl_id: String,
    pub old_value: String,
    pub new_value: String,
    pub kind: ChangeRecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ChangeRecord {
    pub fn csv_row(&self) -> [&str; 6] {
        [
            self.collection_before.as_str(),
            self.collection_after.as_str(),
            self.doc_id.as_str(),
            self.appl_id.as_str(),
            self.old_value.as_str(),
            self.new_value.as_str(),
        ]
    }
}

pub fn missing_document_record(collection_before: &str, collection_after: &str, doc_id: &str) -> ChangeRecord {
    ChangeRecord {
        collection_before: collection_before.to_string(),
        collection_after: collection_after.to_string(),
        doc_id: doc_id.to_string(),
        appl_id: SENTINEL.to_string(),
        old_value: SENTINEL.to_string(),
        new_value: MISSING_DOCUMENT_MARKER.to_string(),
        kind: ChangeRecordKind::DocumentMissing,
        path: None,
    }
}

/// One record per change, all sharing the pair's `doc_id` and `appl_id`.
pub fn flatten_diff(
    collection_before: &str,
    collection_after: &str,
    doc_id: &str,
    appl_id: &str,
    diff: &DiffResult,
) -> Vec<ChangeRecord> {
    diff.iter()
        .map(|(kind, path, detail)| ChangeRecord {
            collection_before: collection_before.to_string(),
            collection_after: collection_after.to_string(),
            doc_id: doc_id.to_string(),
            appl_id: appl_id.to_string(),
            old_value: render_side(detail.old_value.as_ref()),
            new_value: render_side(detail.new_value.as_ref()),
            kind: kind.into(),
            path: Some(path.to_string()),
        })
        .collect()
}

fn render_side(value: Option<&Value>) -> String {
    value.map(render_value).unwrap_or_else(|| SENTINEL.to_string())
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
