use crate::store::{DocumentStore, StoreError, StoreOperation};
use mds_core::{document_id, DOCUMENT_ID_FIELD};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// In-process store keeping collections in insertion order. Mirrors the checks the
/// real store performs on insert: objects only, unique `_id`, generated ids when absent.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RefCell<BTreeMap<String, Vec<Value>>>,
    next_id: Cell<u64>,
    failing: Option<StoreOperation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call of `operation` fails with a store operation error.
    pub fn failing_on(operation: StoreOperation) -> Self {
        Self {
            failing: Some(operation),
            ..Self::default()
        }
    }

    pub fn with_collection(self, name: &str, documents: Vec<Value>) -> Self {
        self.collections.borrow_mut().insert(name.to_string(), documents);
        self
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.borrow().keys().cloned().collect()
    }

    fn check(&self, operation: StoreOperation, collection: &str) -> Result<(), StoreError> {
        if self.failing == Some(operation) {
            return Err(StoreError::operation(operation, collection, "injected failure"));
        }
        Ok(())
    }

    fn generate_id(&self) -> Value {
        let next = self.next_id.get() + 1;
        self.next_id.set(next);
        json!({ "$oid": format!("{next:024x}") })
    }
}

impl DocumentStore for MemoryStore {
    fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        self.check(StoreOperation::Delete, collection)?;
        let mut collections = self.collections.borrow_mut();
        let deleted = collections
            .get_mut(collection)
            .map(|documents| documents.drain(..).count() as u64)
            .unwrap_or(0);
        Ok(deleted)
    }

    fn insert_many(&self, collection: &str, documents: &[Value]) -> Result<usize, StoreError> {
        self.check(StoreOperation::Insert, collection)?;
        let mut prepared = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            let Some(object) = document.as_object() else {
                return Err(StoreError::operation(
                    StoreOperation::Insert,
                    collection,
                    format!("record {index} is not a JSON object"),
                ));
            };
            let mut object = object.clone();
            if !object.contains_key(DOCUMENT_ID_FIELD) {
                object.insert(DOCUMENT_ID_FIELD.to_string(), self.generate_id());
            }
            prepared.push(Value::Object(object));
        }

        let mut collections = self.collections.borrow_mut();
        let target = collections.entry(collection.to_string()).or_default();
        for (index, document) in prepared.iter().enumerate() {
            let id = document_id(document);
            let clash = target
                .iter()
                .chain(&prepared[..index])
                .any(|existing| document_id(existing) == id);
            if clash {
                return Err(StoreError::operation(
                    StoreOperation::Insert,
                    collection,
                    format!("duplicate key {}", id.cloned().unwrap_or(Value::Null)),
                ));
            }
        }
        let inserted = prepared.len();
        target.extend(prepared);
        Ok(inserted)
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.check(StoreOperation::Find, collection)?;
        Ok(self
            .collections
            .borrow()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn find_by_id(&self, collection: &str, id: &Value) -> Result<Option<Value>, StoreError> {
        self.check(StoreOperation::FindOne, collection)?;
        Ok(self.collections.borrow().get(collection).and_then(|documents| {
            documents
                .iter()
                .find(|document| document_id(document) == Some(id))
                .cloned()
        }))
    }

    fn rename_collection(&self, from: &str, to: &str) -> Result<(), StoreError> {
        self.check(StoreOperation::Rename, from)?;
        let mut collections = self.collections.borrow_mut();
        let Some(documents) = collections.remove(from) else {
            return Err(StoreError::operation(
                StoreOperation::Rename,
                from,
                "source collection does not exist",
            ));
        };
        collections.insert(to.to_string(), documents);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
