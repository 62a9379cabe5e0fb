use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Minimal document-store surface used by the sync and diff jobs. Documents are
/// exchanged as JSON values; store-specific types stay inside the implementation.
pub trait DocumentStore {
    fn delete_all(&self, collection: &str) -> Result<u64, StoreError>;
    fn insert_many(&self, collection: &str, documents: &[Value]) -> Result<usize, StoreError>;
    fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
    fn find_by_id(&self, collection: &str, id: &Value) -> Result<Option<Value>, StoreError>;
    /// Replaces `to` with `from` in one step, dropping the previous `to`.
    fn rename_collection(&self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Releases the connection. Dropping without closing leaves cleanup to the driver.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        (**self).delete_all(collection)
    }

    fn insert_many(&self, collection: &str, documents: &[Value]) -> Result<usize, StoreError> {
        (**self).insert_many(collection, documents)
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        (**self).find_all(collection)
    }

    fn find_by_id(&self, collection: &str, id: &Value) -> Result<Option<Value>, StoreError> {
        (**self).find_by_id(collection, id)
    }

    fn rename_collection(&self, from: &str, to: &str) -> Result<(), StoreError> {
        (**self).rename_collection(from, to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOperation {
    Delete,
    Insert,
    Find,
    FindOne,
    Rename,
}

impl Display for StoreOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StoreOperation::Delete => "delete",
            StoreOperation::Insert => "insert",
            StoreOperation::Find => "find",
            StoreOperation::FindOne => "find_one",
            StoreOperation::Rename => "rename",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store connection failed `{uri}`: {reason}")]
    Connection { uri: String, reason: String },
    #[error("store {operation} on `{collection}` failed: {reason}")]
    Operation {
        operation: StoreOperation,
        collection: String,
        reason: String,
    },
}

impl StoreError {
    pub fn operation(operation: StoreOperation, collection: &str, reason: impl Into<String>) -> Self {
        StoreError::Operation {
            operation,
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }
}

pub fn staging_collection_name(collection: &str) -> String {
    format!("{collection}__staging")
}
