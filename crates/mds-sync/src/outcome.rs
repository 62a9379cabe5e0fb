use crate::ingest::{SyncError, SyncReport};
use mds_store::StoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    Fetch,
    StoreConnection,
    StoreOperation,
    Fingerprint,
    InvalidRecord,
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Fetch(_) => SyncErrorKind::Fetch,
            SyncError::Store(StoreError::Connection { .. }) => SyncErrorKind::StoreConnection,
            SyncError::Store(StoreError::Operation { .. }) => SyncErrorKind::StoreOperation,
            SyncError::Fingerprint(_) => SyncErrorKind::Fingerprint,
            SyncError::InvalidRecord { .. } => SyncErrorKind::InvalidRecord,
        }
    }
}

/// Result of one ingest run as seen by a scheduler: a failure is data, not a panic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Written { report: SyncReport },
    Skipped { report: SyncReport },
    Failed { kind: SyncErrorKind, message: String },
}

impl SyncOutcome {
    pub fn from_result(result: Result<SyncReport, SyncError>) -> Self {
        match result {
            Ok(report) if report.written > 0 => SyncOutcome::Written { report },
            Ok(report) => SyncOutcome::Skipped { report },
            Err(error) => SyncOutcome::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
        }
    }

    pub fn written(&self) -> usize {
        match self {
            SyncOutcome::Written { report } | SyncOutcome::Skipped { report } => report.written,
            SyncOutcome::Failed { .. } => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

#[cfg(test)]
#[path = "outcome_test.rs"]
mod tests;
