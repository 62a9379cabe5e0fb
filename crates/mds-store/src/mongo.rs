use crate::store::{DocumentStore, StoreError, StoreOperation};
use mds_core::redact_uri;
use mongodb::bson::{doc, Bson, Document};
use mongodb::sync::{Client, Collection, Database};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

pub struct MongoStore {
    client: Client,
    database: Database,
    redacted_uri: String,
}

impl MongoStore {
    /// Opens a client and pings the database so an unreachable server fails here
    /// instead of on the first query.
    pub fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let redacted_uri = redact_uri(uri);
        let connection_error = |reason: String| StoreError::Connection {
            uri: redacted_uri.clone(),
            reason,
        };
        let client = Client::with_uri_str(uri).map_err(|error| connection_error(error.to_string()))?;
        let database = client.database(database);
        database
            .run_command(doc! { "ping": 1 })
            .run()
            .map_err(|error| connection_error(error.to_string()))?;
        info!(uri = %redacted_uri, database = database.name(), "connected to document store");
        Ok(Self {
            client,
            database,
            redacted_uri,
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

impl DocumentStore for MongoStore {
    fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .delete_many(doc! {})
            .run()
            .map_err(|error| StoreError::operation(StoreOperation::Delete, collection, error.to_string()))?;
        Ok(result.deleted_count)
    }

    fn insert_many(&self, collection: &str, documents: &[Value]) -> Result<usize, StoreError> {
        if documents.is_empty() {
            return Ok(0);
        }
        let encoded = documents
            .iter()
            .enumerate()
            .map(|(index, document)| to_bson_document(document, index))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| StoreError::operation(StoreOperation::Insert, collection, reason))?;
        let result = self
            .collection(collection)
            .insert_many(encoded)
            .run()
            .map_err(|error| StoreError::operation(StoreOperation::Insert, collection, error.to_string()))?;
        Ok(result.inserted_ids.len())
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let cursor = self
            .collection(collection)
            .find(doc! {})
            .run()
            .map_err(|error| StoreError::operation(StoreOperation::Find, collection, error.to_string()))?;
        let mut documents = Vec::new();
        for document in cursor {
            let document = document
                .map_err(|error| StoreError::operation(StoreOperation::Find, collection, error.to_string()))?;
            documents.push(Bson::Document(document).into_relaxed_extjson());
        }
        Ok(documents)
    }

    fn find_by_id(&self, collection: &str, id: &Value) -> Result<Option<Value>, StoreError> {
        let id = Bson::try_from(id.clone()).map_err(|error| {
            StoreError::operation(StoreOperation::FindOne, collection, format!("invalid document id: {error}"))
        })?;
        let found = self
            .collection(collection)
            .find_one(doc! { "_id": id })
            .run()
            .map_err(|error| StoreError::operation(StoreOperation::FindOne, collection, error.to_string()))?;
        Ok(found.map(|document| Bson::Document(document).into_relaxed_extjson()))
    }

    fn rename_collection(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let database = self.database.name();
        self.client
            .database("admin")
            .run_command(doc! {
                "renameCollection": format!("{database}.{from}"),
                "to": format!("{database}.{to}"),
                "dropTarget": true,
            })
            .run()
            .map_err(|error| StoreError::operation(StoreOperation::Rename, from, error.to_string()))?;
        Ok(())
    }

    fn close(self) {
        let Self {
            client,
            database,
            redacted_uri,
        } = self;
        drop(database);
        client.shutdown().run();
        debug!(uri = %redacted_uri, "document store connection closed");
    }
}

/// Builds the BSON document field by field so `$`-prefixed keys are stored as
/// written instead of being read as extended JSON.
pub(crate) fn to_bson_document(record: &Value, index: usize) -> Result<Document, String> {
    match record {
        Value::Object(object) => Ok(object_to_document(object)),
        other => Err(format!("record {index} is not a JSON object (got {})", json_kind(other))),
    }
}

fn object_to_document(object: &Map<String, Value>) -> Document {
    object
        .iter()
        .map(|(key, value)| (key.clone(), value_to_bson(value)))
        .collect()
}

fn value_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(flag) => Bson::Boolean(*flag),
        Value::Number(number) => number_to_bson(number),
        Value::String(text) => Bson::String(text.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(value_to_bson).collect()),
        Value::Object(object) => Bson::Document(object_to_document(object)),
    }
}

// Same widths the driver picks: Int32 when it fits, then Int64, then Double.
fn number_to_bson(number: &Number) -> Bson {
    if let Some(integer) = number.as_i64() {
        return match i32::try_from(integer) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(integer),
        };
    }
    Bson::Double(number.as_f64().unwrap_or(f64::NAN))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "mongo_test.rs"]
mod tests;
