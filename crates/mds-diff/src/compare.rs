use crate::document_diff::{diff_documents, ChangeKind, DiffResult};
use crate::record::{flatten_diff, missing_document_record, ChangeRecord};
use crate::report_csv::{write_change_report, ReportWriteError};
use mds_core::{document_id, render_document_id, secondary_id, FieldPath, FieldPathSegment, SENTINEL};
use mds_store::{DocumentStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_APPL_ID_PATH: &str = "nih_reporter.appl_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRequest {
    pub collection_before: String,
    pub collection_after: String,
    pub appl_id_path: FieldPath,
}

impl CompareRequest {
    pub fn new(collection_before: impl Into<String>, collection_after: impl Into<String>) -> Self {
        Self {
            collection_before: collection_before.into(),
            collection_after: collection_after.into(),
            appl_id_path: default_appl_id_path(),
        }
    }

    pub fn with_appl_id_path(mut self, path: FieldPath) -> Self {
        self.appl_id_path = path;
        self
    }
}

/// Emitted while the before-collection is traversed, before the report is complete.
#[derive(Debug)]
pub enum DiffEvent<'a> {
    DocumentMissing {
        doc_id: &'a str,
    },
    DocumentChanged {
        doc_id: &'a str,
        appl_id: &'a str,
        diff: &'a DiffResult,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub documents_visited: usize,
    pub documents_missing: usize,
    pub documents_changed: usize,
    pub documents_unchanged: usize,
    pub documents_without_id: usize,
    pub rows: usize,
    pub changes_by_kind: BTreeMap<ChangeKind, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    pub collection_before: String,
    pub collection_after: String,
    pub summary: DiffSummary,
    pub records: Vec<ChangeRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Report(#[from] ReportWriteError),
}

/// Visits every before-document once and looks up its counterpart by `_id`.
/// Documents that only exist in the after-collection are not reported.
pub fn compare_collections<S: DocumentStore + ?Sized>(
    store: &S,
    request: &CompareRequest,
    observer: &mut dyn FnMut(&DiffEvent<'_>),
) -> Result<DiffReport, DiffError> {
    let before_name = request.collection_before.as_str();
    let after_name = request.collection_after.as_str();
    info!(before = before_name, after = after_name, "comparing collections");

    let mut summary = DiffSummary::default();
    let mut records = Vec::<ChangeRecord>::new();
    for before in store.find_all(before_name)? {
        summary.documents_visited += 1;
        let Some(id) = document_id(&before) else {
            warn!(collection = before_name, "document without _id skipped");
            summary.documents_without_id += 1;
            continue;
        };
        let doc_id = render_document_id(id);

        let Some(after) = store.find_by_id(after_name, id)? else {
            debug!(doc_id = doc_id.as_str(), "document missing from after collection");
            summary.documents_missing += 1;
            observer(&DiffEvent::DocumentMissing {
                doc_id: doc_id.as_str(),
            });
            records.push(missing_document_record(before_name, after_name, doc_id.as_str()));
            continue;
        };

        let diff = diff_documents(&before, &after);
        if diff.is_empty() {
            summary.documents_unchanged += 1;
            continue;
        }
        summary.documents_changed += 1;
        let appl_id = secondary_id(&before, &request.appl_id_path);
        if appl_id == SENTINEL {
            debug!(doc_id = doc_id.as_str(), path = %request.appl_id_path, "no appl_id found");
        }
        observer(&DiffEvent::DocumentChanged {
            doc_id: doc_id.as_str(),
            appl_id: appl_id.as_str(),
            diff: &diff,
        });
        for (kind, _, _) in diff.iter() {
            *summary.changes_by_kind.entry(kind).or_default() += 1;
        }
        records.extend(flatten_diff(before_name, after_name, doc_id.as_str(), appl_id.as_str(), &diff));
    }

    summary.rows = records.len();
    info!(
        visited = summary.documents_visited,
        missing = summary.documents_missing,
        changed = summary.documents_changed,
        rows = summary.rows,
        "comparison finished"
    );
    Ok(DiffReport {
        collection_before: request.collection_before.clone(),
        collection_after: request.collection_after.clone(),
        summary,
        records,
    })
}

/// Connects, compares the two collections named in `request`, releases the store
/// and only then writes the CSV report to `output`. Nothing is written when the
/// store fails mid-run.
pub fn diff<S, F>(
    connect: F,
    request: &CompareRequest,
    output: &Path,
    observer: &mut dyn FnMut(&DiffEvent<'_>),
) -> Result<DiffReport, DiffError>
where
    S: DocumentStore,
    F: FnOnce() -> Result<S, StoreError>,
{
    let store = connect()?;
    let compared = compare_collections(&store, request, observer);
    store.close();
    let report = compared?;

    let rows = write_change_report(output, &report.records)?;
    info!(path = %output.display(), rows, "change report written");
    Ok(report)
}

fn default_appl_id_path() -> FieldPath {
    FieldPath::from_segments(vec![
        FieldPathSegment::Key("nih_reporter".to_string()),
        FieldPathSegment::Key("appl_id".to_string()),
    ])
}

#[cfg(test)]
#[path = "compare_test.rs"]
mod tests;
