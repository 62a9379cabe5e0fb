pub mod ingest;
pub mod outcome;
pub mod source;

pub use ingest::{
    replace_collection, sync, sync_catalog, ReplaceMode, ReplaceStats, SyncError, SyncReport,
    SyncRequest,
};
pub use outcome::{SyncErrorKind, SyncOutcome};
pub use source::{
    CatalogEndpoint, CatalogSource, FetchError, HttpCatalogSource, DEFAULT_CATALOG_ENDPOINT,
    DEFAULT_FETCH_TIMEOUT_MS,
};
