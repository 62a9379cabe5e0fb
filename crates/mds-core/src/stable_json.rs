use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub fn stable_json_bytes(value: &Value) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&normalize_value(value))
}

/// Compact JSON text with sorted object keys.
pub fn stable_json_text(value: &Value) -> String {
    normalize_value(value).to_string()
}

fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Object(object) => normalize_object(object),
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        _ => value.clone(),
    }
}

fn normalize_object(object: &Map<String, Value>) -> Value {
    let ordered = object
        .iter()
        .map(|(key, value)| (key.clone(), normalize_value(value)))
        .collect::<BTreeMap<_, _>>();
    Value::Object(ordered.into_iter().collect())
}

#[cfg(test)]
#[path = "stable_json_test.rs"]
mod tests;
