use crate::source::{CatalogEndpoint, CatalogSource, FetchError, HttpCatalogSource};
use mds_core::{fingerprint_records, records_from_payload, PayloadShape};
use mds_store::{staging_collection_name, DocumentStore, MongoStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::{info, warn};

/// How the target collection is replaced.
///
/// `DeleteThenInsert` issues two independent operations: a crash between them leaves
/// the collection empty. `StagingSwap` loads a staging collection and renames it over
/// the target, so readers see either the old or the new full set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceMode {
    #[default]
    DeleteThenInsert,
    StagingSwap,
}

impl Display for ReplaceMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplaceMode::DeleteThenInsert => f.write_str("delete-then-insert"),
            ReplaceMode::StagingSwap => f.write_str("staging-swap"),
        }
    }
}

impl FromStr for ReplaceMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "delete-then-insert" => Ok(ReplaceMode::DeleteThenInsert),
            "staging-swap" => Ok(ReplaceMode::StagingSwap),
            other => Err(format!(
                "unknown replace mode `{other}` (expected `delete-then-insert` or `staging-swap`)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceStats {
    pub written: usize,
    /// Unknown in staging mode, where the previous documents go away with the rename.
    pub deleted: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub source: String,
    pub collection: String,
    pub payload_shape: PayloadShape,
    pub replace_mode: ReplaceMode,
    pub fetched: usize,
    pub written: usize,
    pub deleted: Option<u64>,
    pub fingerprint: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("fingerprint fetched records failed: {0}")]
    Fingerprint(#[from] serde_json::Error),
    #[error("catalog record {index} is not an object; collection left untouched")]
    InvalidRecord { index: usize },
}

/// Everything `sync` needs to move one catalog into one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub endpoint: CatalogEndpoint,
    pub store_uri: String,
    pub database: String,
    pub collection: String,
    pub replace_mode: ReplaceMode,
}

impl SyncRequest {
    pub fn new(
        endpoint: CatalogEndpoint,
        store_uri: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            store_uri: store_uri.into(),
            database: database.into(),
            collection: collection.into(),
            replace_mode: ReplaceMode::default(),
        }
    }

    pub fn with_replace_mode(mut self, mode: ReplaceMode) -> Self {
        self.replace_mode = mode;
        self
    }
}

pub fn replace_collection<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    records: &[Value],
    mode: ReplaceMode,
) -> Result<ReplaceStats, StoreError> {
    match mode {
        ReplaceMode::DeleteThenInsert => {
            let deleted = store.delete_all(collection)?;
            info!(collection, deleted, "collection cleared");
            let written = store.insert_many(collection, records)?;
            Ok(ReplaceStats {
                written,
                deleted: Some(deleted),
            })
        }
        ReplaceMode::StagingSwap => {
            let staging = staging_collection_name(collection);
            let leftover = store.delete_all(staging.as_str())?;
            if leftover > 0 {
                warn!(staging = staging.as_str(), leftover, "cleared leftover staging documents");
            }
            let written = store.insert_many(staging.as_str(), records)?;
            store.rename_collection(staging.as_str(), collection)?;
            info!(collection, staging = staging.as_str(), "staging collection swapped in");
            Ok(ReplaceStats {
                written,
                deleted: None,
            })
        }
    }
}

/// Fetches the catalog and replaces `collection` with it. The store is only
/// connected when there is something to write and is released when this returns.
pub fn sync_catalog<C, S, F>(
    source: &C,
    connect: F,
    collection: &str,
    mode: ReplaceMode,
) -> Result<SyncReport, SyncError>
where
    C: CatalogSource + ?Sized,
    S: DocumentStore,
    F: FnOnce() -> Result<S, StoreError>,
{
    let source_label = source.describe();
    info!(source = source_label.as_str(), "fetching metadata catalog");
    let catalog = records_from_payload(source.fetch()?);
    if catalog.shape == PayloadShape::Unsupported {
        warn!(source = source_label.as_str(), "unexpected catalog payload shape, expected array or object");
    }
    let fingerprint = fingerprint_records(&catalog.records)?;
    let mut report = SyncReport {
        source: source_label,
        collection: collection.to_string(),
        payload_shape: catalog.shape,
        replace_mode: mode,
        fetched: catalog.len(),
        written: 0,
        deleted: None,
        fingerprint,
    };

    if catalog.is_empty() {
        info!(collection, "no records fetched, collection left untouched");
        return Ok(report);
    }
    info!(fetched = report.fetched, fingerprint = report.fingerprint.as_str(), "catalog fetched");
    // The store only accepts documents; reject before anything is deleted.
    if let Some(index) = catalog.records.iter().position(|record| !record.is_object()) {
        warn!(collection, index, "catalog record is not an object, collection left untouched");
        return Err(SyncError::InvalidRecord { index });
    }

    let store = connect()?;
    let replaced = replace_collection(&store, collection, &catalog.records, mode);
    store.close();
    let stats = replaced?;
    report.written = stats.written;
    report.deleted = stats.deleted;
    info!(collection, written = report.written, "collection replaced");
    Ok(report)
}

/// Fetches `request.endpoint` and replaces `request.database.collection` with it.
pub fn sync(request: &SyncRequest) -> Result<SyncReport, SyncError> {
    let source = HttpCatalogSource::new(request.endpoint.clone())?;
    sync_catalog(
        &source,
        || MongoStore::connect(request.store_uri.as_str(), request.database.as_str()),
        request.collection.as_str(),
        request.replace_mode,
    )
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
