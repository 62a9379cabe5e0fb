use super::{replace_collection, sync, sync_catalog, ReplaceMode, SyncError, SyncRequest};
use crate::source::{CatalogEndpoint, CatalogSource, FetchError};
use mds_core::PayloadShape;
use mds_store::{DocumentStore, MemoryStore, StoreError, StoreOperation};
use serde_json::{json, Value};
use std::cell::Cell;
use std::net::TcpListener;
use std::str::FromStr;

struct StaticSource {
    payload: Result<Value, FetchError>,
}

impl StaticSource {
    fn ok(payload: Value) -> Self {
        Self { payload: Ok(payload) }
    }
}

impl CatalogSource for StaticSource {
    fn describe(&self) -> String {
        "static://catalog".to_string()
    }

    fn fetch(&self) -> Result<Value, FetchError> {
        self.payload.clone()
    }
}

fn studies() -> Vec<Value> {
    vec![
        json!({"_id": "HDP001", "gen3_discovery": {"title": "Opioid study"}, "nih_reporter": {"appl_id": 10001}}),
        json!({"_id": "HDP002", "gen3_discovery": {"title": "Pain study", "tags": ["pain", "sleep"]}}),
        json!({"_id": "HDP003", "gen3_discovery": {}}),
    ]
}

#[test]
fn sync_into_empty_collection_round_trips_every_record() {
    let store = MemoryStore::new();
    let source = StaticSource::ok(Value::Array(studies()));

    let report = sync_catalog(&source, || Ok(&store), "mds_jan2025", ReplaceMode::DeleteThenInsert)
        .expect("sync must succeed");

    assert_eq!(report.fetched, 3);
    assert_eq!(report.written, 3);
    assert_eq!(report.deleted, Some(0));
    assert_eq!(report.payload_shape, PayloadShape::Sequence);
    assert_eq!(store.find_all("mds_jan2025").expect("find"), studies());
}

#[test]
fn mapping_payload_values_are_written_and_keys_dropped() {
    let store = MemoryStore::new();
    let source = StaticSource::ok(json!({
        "HDP001": {"title": "one"},
        "HDP002": {"title": "two"}
    }));

    let report = sync_catalog(&source, || Ok(&store), "mds", ReplaceMode::DeleteThenInsert)
        .expect("sync must succeed");

    assert_eq!(report.payload_shape, PayloadShape::Mapping);
    assert_eq!(report.written, 2);
    let stored = store.find_all("mds").expect("find");
    assert!(stored.iter().all(|document| document.get("_id").is_some()));
    assert!(stored.iter().all(|document| document.get("HDP001").is_none()));
}

#[test]
fn sync_replaces_previous_contents_entirely() {
    let store = MemoryStore::new().with_collection(
        "mds",
        vec![json!({"_id": "OLD1"}), json!({"_id": "HDP001", "stale": true})],
    );
    let source = StaticSource::ok(Value::Array(studies()));

    let report = sync_catalog(&source, || Ok(&store), "mds", ReplaceMode::DeleteThenInsert)
        .expect("sync must succeed");

    assert_eq!(report.deleted, Some(2));
    assert_eq!(store.find_all("mds").expect("find"), studies());
}

#[test]
fn syncing_the_same_payload_twice_is_idempotent() {
    let once = MemoryStore::new();
    let twice = MemoryStore::new();
    let source = StaticSource::ok(Value::Array(studies()));

    let first = sync_catalog(&source, || Ok(&once), "mds", ReplaceMode::DeleteThenInsert)
        .expect("sync must succeed");
    for _ in 0..2 {
        sync_catalog(&source, || Ok(&twice), "mds", ReplaceMode::DeleteThenInsert)
            .expect("sync must succeed");
    }
    let second = sync_catalog(&source, || Ok(&twice), "mds", ReplaceMode::StagingSwap)
        .expect("sync must succeed");

    assert_eq!(once.find_all("mds").expect("find"), twice.find_all("mds").expect("find"));
    assert_eq!(first.fingerprint, second.fingerprint);
}

#[test]
fn unsupported_payload_writes_nothing_and_never_connects() {
    for payload in [json!(42), json!("catalog offline")] {
        let store = MemoryStore::new().with_collection("mds", vec![json!({"_id": "KEEP"})]);
        let connected = Cell::new(false);
        let source = StaticSource::ok(payload);

        let report = sync_catalog(
            &source,
            || {
                connected.set(true);
                Ok(&store)
            },
            "mds",
            ReplaceMode::DeleteThenInsert,
        )
        .expect("unsupported shape is not fatal");

        assert_eq!(report.payload_shape, PayloadShape::Unsupported);
        assert_eq!(report.written, 0);
        assert!(!connected.get());
        assert_eq!(store.find_all("mds").expect("find"), vec![json!({"_id": "KEEP"})]);
    }
}

#[test]
fn non_object_records_fail_before_anything_is_deleted() {
    for payload in [json!([1, 2, 3]), json!([{"_id": "NEW"}, "stray"]), json!({"a": {"_id": "NEW"}, "b": 7})] {
        let store = MemoryStore::new().with_collection("mds", vec![json!({"_id": "KEEP"})]);
        let connected = Cell::new(false);
        let source = StaticSource::ok(payload);

        let error = sync_catalog(
            &source,
            || {
                connected.set(true);
                Ok(&store)
            },
            "mds",
            ReplaceMode::DeleteThenInsert,
        )
        .expect_err("non-object record must fail");

        assert!(matches!(error, SyncError::InvalidRecord { .. }));
        assert!(!connected.get());
        assert_eq!(store.find_all("mds").expect("find"), vec![json!({"_id": "KEEP"})]);
    }
}

#[test]
fn sync_surfaces_fetch_failure_before_connecting() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/mds/metadata", listener.local_addr().expect("addr"));
    drop(listener);
    let endpoint = CatalogEndpoint::new(url)
        .and_then(|endpoint| endpoint.with_timeout_ms(2_000))
        .expect("endpoint");
    let request = SyncRequest::new(endpoint, "mongodb://127.0.0.1:1", "heal", "mds")
        .with_replace_mode(ReplaceMode::StagingSwap);

    let error = sync(&request).expect_err("must fail");

    assert!(matches!(error, SyncError::Fetch(_)));
}

#[test]
fn empty_sequence_skips_delete_and_insert() {
    let store = MemoryStore::new().with_collection("mds", vec![json!({"_id": "KEEP"})]);
    let source = StaticSource::ok(json!([]));

    let report = sync_catalog(&source, || Ok(&store), "mds", ReplaceMode::DeleteThenInsert)
        .expect("sync must succeed");

    assert_eq!(report.written, 0);
    assert_eq!(report.deleted, None);
    assert_eq!(store.find_all("mds").expect("find").len(), 1);
}

#[test]
fn fetch_failure_is_returned_and_store_untouched() {
    let store = MemoryStore::new().with_collection("mds", vec![json!({"_id": "KEEP"})]);
    let source = StaticSource {
        payload: Err(FetchError::Status {
            url: "static://catalog".to_string(),
            status: 502,
        }),
    };

    let error = sync_catalog(&source, || Ok(&store), "mds", ReplaceMode::DeleteThenInsert)
        .expect_err("must fail");

    assert!(matches!(error, SyncError::Fetch(FetchError::Status { status: 502, .. })));
    assert_eq!(store.find_all("mds").expect("find").len(), 1);
}

#[test]
fn connection_failure_is_returned() {
    let source = StaticSource::ok(Value::Array(studies()));
    let error = sync_catalog(
        &source,
        || -> Result<MemoryStore, StoreError> {
            Err(StoreError::Connection {
                uri: "mongodb://heal:[REDACTED]@db".to_string(),
                reason: "server selection timeout".to_string(),
            })
        },
        "mds",
        ReplaceMode::DeleteThenInsert,
    )
    .expect_err("must fail");

    assert!(matches!(error, SyncError::Store(StoreError::Connection { .. })));
}

#[test]
fn failed_insert_after_delete_leaves_collection_empty() {
    let store = MemoryStore::failing_on(StoreOperation::Insert)
        .with_collection("mds", vec![json!({"_id": "OLD1"})]);

    let error = replace_collection(&store, "mds", &studies(), ReplaceMode::DeleteThenInsert)
        .expect_err("must fail");

    assert!(matches!(error, StoreError::Operation { operation: StoreOperation::Insert, .. }));
    assert!(store.find_all("mds").expect("find").is_empty());
}

#[test]
fn failed_staging_insert_keeps_previous_contents() {
    let store = MemoryStore::failing_on(StoreOperation::Insert)
        .with_collection("mds", vec![json!({"_id": "OLD1"})]);

    replace_collection(&store, "mds", &studies(), ReplaceMode::StagingSwap).expect_err("must fail");

    assert_eq!(store.find_all("mds").expect("find"), vec![json!({"_id": "OLD1"})]);
}

#[test]
fn staging_swap_replaces_target_and_removes_staging() {
    let store = MemoryStore::new()
        .with_collection("mds", vec![json!({"_id": "OLD1"})])
        .with_collection("mds__staging", vec![json!({"_id": "LEFTOVER"})]);

    let stats = replace_collection(&store, "mds", &studies(), ReplaceMode::StagingSwap)
        .expect("swap must succeed");

    assert_eq!(stats.written, 3);
    assert_eq!(stats.deleted, None);
    assert_eq!(store.find_all("mds").expect("find"), studies());
    assert_eq!(store.collection_names(), vec!["mds".to_string()]);
}

#[test]
fn replace_mode_parses_and_renders_kebab_case() {
    for mode in [ReplaceMode::DeleteThenInsert, ReplaceMode::StagingSwap] {
        assert_eq!(ReplaceMode::from_str(mode.to_string().as_str()), Ok(mode));
    }
    assert!(ReplaceMode::from_str("upsert").is_err());
    assert_eq!(ReplaceMode::default(), ReplaceMode::DeleteThenInsert);
}
