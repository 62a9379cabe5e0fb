use super::{finish_sync, run_diff, RunnerError};
use crate::cli::OutputFormat;
use crate::config::DiffSettings;
use mds_core::PayloadShape;
use mds_diff::{CompareRequest, CSV_HEADER};
use mds_store::{MemoryStore, StoreOperation};
use mds_sync::{FetchError, ReplaceMode, SyncError, SyncReport};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn report(written: usize) -> SyncReport {
    SyncReport {
        source: "https://mds.example.org/metadata".to_string(),
        collection: "mds_snapshot".to_string(),
        payload_shape: PayloadShape::Sequence,
        replace_mode: ReplaceMode::DeleteThenInsert,
        fetched: written,
        written,
        deleted: Some(3),
        fingerprint: "abc123".to_string(),
    }
}

fn transport_failure() -> SyncError {
    SyncError::Fetch(FetchError::Transport {
        url: "https://mds.example.org/metadata".to_string(),
        reason: "connection refused".to_string(),
    })
}

#[test]
fn finish_sync_renders_written_count() {
    let output = finish_sync(Ok(report(2)), false, OutputFormat::Text).expect("must render");
    assert!(output.starts_with("2 records written to mds_snapshot"));
}

#[test]
fn finish_sync_propagates_failure_without_soft_fail() {
    let error = finish_sync(Err(transport_failure()), false, OutputFormat::Text).expect_err("must fail");
    assert!(matches!(error, RunnerError::Sync(SyncError::Fetch(_))));
}

#[test]
fn finish_sync_soft_fail_reports_zero_written() {
    let output = finish_sync(Err(transport_failure()), true, OutputFormat::Text).expect("soft fail must succeed");
    assert!(output.starts_with("0 records written"));
    assert!(output.contains("connection refused"));

    let output = finish_sync(Err(transport_failure()), true, OutputFormat::Json).expect("soft fail must succeed");
    let value: Value = serde_json::from_str(output.as_str()).expect("json output");
    assert_eq!(value["status"], "failed");
    assert_eq!(value["kind"], "fetch");
}

#[test]
fn finish_sync_json_marks_empty_fetch_as_skipped() {
    let output = finish_sync(Ok(report(0)), false, OutputFormat::Json).expect("must render");
    let value: Value = serde_json::from_str(output.as_str()).expect("json output");
    assert_eq!(value["status"], "skipped");
    assert_eq!(value["report"]["written"], 0);
}

#[test]
fn run_diff_prints_changes_and_writes_report() {
    let store = MemoryStore::new()
        .with_collection(
            "mds_jan2025",
            vec![
                json!({"_id": "A", "title": "gone"}),
                json!({"_id": "B", "nih_reporter": {"appl_id": 42}, "title": "old"}),
                json!({"_id": "C", "title": "same"}),
            ],
        )
        .with_collection(
            "mds_feb2025",
            vec![
                json!({"_id": "B", "nih_reporter": {"appl_id": 42}, "title": "new"}),
                json!({"_id": "C", "title": "same"}),
            ],
        );
    let settings = settings("diff-report");
    let mut console = Vec::<u8>::new();

    let summary = run_diff(|| Ok(store), &settings, &mut console, OutputFormat::Text).expect("diff must succeed");

    let console = String::from_utf8(console).expect("utf8 console");
    assert!(console.contains("Document with _id A exists in old collection but not in new collection."));
    assert!(console.contains("### Changes for document with _id B"));
    assert!(console.contains("changed: ** $.title:"));
    assert!(summary.contains("3 documents compared: 1 changed, 1 missing, 1 unchanged"));
    assert!(summary.contains(format!("Changes saved to {}", settings.output.display()).as_str()));

    let mut reader = csv::Reader::from_path(&settings.output).expect("report must exist");
    let header = reader.headers().expect("header").iter().map(str::to_string).collect::<Vec<_>>();
    assert_eq!(header, CSV_HEADER.to_vec());
    let rows = reader
        .records()
        .map(|row| row.expect("row").iter().map(str::to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        vec![
            vec!["mds_jan2025", "mds_feb2025", "A", "N/A", "N/A", "Document missing"],
            vec!["mds_jan2025", "mds_feb2025", "B", "42", "old", "new"],
        ]
    );
}

#[test]
fn run_diff_without_appl_id_says_so() {
    let store = MemoryStore::new()
        .with_collection("mds_jan2025", vec![json!({"_id": "B", "title": "old"})])
        .with_collection("mds_feb2025", vec![json!({"_id": "B", "title": "new"})]);
    let settings = settings("no-appl-id");
    let mut console = Vec::<u8>::new();

    run_diff(|| Ok(store), &settings, &mut console, OutputFormat::Text).expect("diff must succeed");

    let console = String::from_utf8(console).expect("utf8 console");
    assert!(console.contains("No appl_id found."));
}

#[test]
fn run_diff_store_failure_leaves_no_report() {
    let store = MemoryStore::failing_on(StoreOperation::Find)
        .with_collection("mds_jan2025", vec![json!({"_id": "A"})]);
    let settings = settings("store-failure");
    let mut console = Vec::<u8>::new();

    let error = run_diff(|| Ok(store), &settings, &mut console, OutputFormat::Text).expect_err("must fail");

    assert!(matches!(error, RunnerError::Diff(_)));
    assert!(!settings.output.exists());
}

#[test]
fn run_diff_json_summary_keeps_console_quiet() {
    let store = MemoryStore::new()
        .with_collection("mds_jan2025", vec![json!({"_id": "A"})])
        .with_collection("mds_feb2025", vec![]);
    let settings = settings("json-summary");
    let mut console = Vec::<u8>::new();

    let output = run_diff(|| Ok(store), &settings, &mut console, OutputFormat::Json).expect("diff must succeed");

    assert!(console.is_empty());
    let value: Value = serde_json::from_str(output.as_str()).expect("json output");
    assert_eq!(value["summary"]["documents_missing"], 1);
    assert_eq!(value["summary"]["rows"], 1);
}

fn settings(prefix: &str) -> DiffSettings {
    let mut output = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time must be monotonic")
        .as_nanos();
    output.push(format!("mds-runner-{prefix}-{}-{nanos}.csv", std::process::id()));
    DiffSettings {
        store_uri: "mongodb://unused".to_string(),
        database: "heal".to_string(),
        request: CompareRequest::new("mds_jan2025", "mds_feb2025"),
        output: PathBuf::from(output),
    }
}
