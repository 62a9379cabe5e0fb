use mds_core::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Changed,
    TypeChanged,
    Added,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Changed => "changed",
            ChangeKind::TypeChanged => "type_changed",
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
        }
    }
}

/// `None` marks a side where the path does not exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// Differences between two documents, grouped by kind and then by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    changes: BTreeMap<ChangeKind, BTreeMap<FieldPath, ChangeDetail>>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.values().map(BTreeMap::len).sum()
    }

    pub fn of_kind(&self, kind: ChangeKind) -> Option<&BTreeMap<FieldPath, ChangeDetail>> {
        self.changes.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChangeKind, &FieldPath, &ChangeDetail)> + '_ {
        self.changes
            .iter()
            .flat_map(|(kind, paths)| paths.iter().map(move |(path, detail)| (*kind, path, detail)))
    }

    fn record(&mut self, kind: ChangeKind, path: FieldPath, old_value: Option<&Value>, new_value: Option<&Value>) {
        self.changes.entry(kind).or_default().insert(
            path,
            ChangeDetail {
                old_value: old_value.cloned(),
                new_value: new_value.cloned(),
            },
        );
    }
}

pub fn diff_documents(before: &Value, after: &Value) -> DiffResult {
    let mut result = DiffResult::default();
    walk(&FieldPath::root(), before, after, &mut result);
    result
}

fn walk(path: &FieldPath, before: &Value, after: &Value, out: &mut DiffResult) {
    match (before, after) {
        (Value::Object(left), Value::Object(right)) => walk_objects(path, left, right, out),
        (Value::Array(left), Value::Array(right)) => walk_arrays(path, left, right, out),
        _ if value_kind(before) != value_kind(after) => {
            out.record(ChangeKind::TypeChanged, path.clone(), Some(before), Some(after));
        }
        _ if before != after => {
            out.record(ChangeKind::Changed, path.clone(), Some(before), Some(after));
        }
        _ => {}
    }
}

fn walk_objects(path: &FieldPath, left: &Map<String, Value>, right: &Map<String, Value>, out: &mut DiffResult) {
    for (key, before) in left {
        let child = path.child_key(key.as_str());
        match right.get(key) {
            Some(after) => walk(&child, before, after, out),
            None => out.record(ChangeKind::Removed, child, Some(before), None),
        }
    }
    for (key, after) in right {
        if !left.contains_key(key) {
            out.record(ChangeKind::Added, path.child_key(key.as_str()), None, Some(after));
        }
    }
}

fn walk_arrays(path: &FieldPath, left: &[Value], right: &[Value], out: &mut DiffResult) {
    let common = left.len().min(right.len());
    for index in 0..common {
        walk(&path.child_index(index), &left[index], &right[index], out);
    }
    for (index, before) in left.iter().enumerate().skip(common) {
        out.record(ChangeKind::Removed, path.child_index(index), Some(before), None);
    }
    for (index, after) in right.iter().enumerate().skip(common) {
        out.record(ChangeKind::Added, path.child_index(index), None, Some(after));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

fn value_kind(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::Null,
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(number) if number.is_f64() => ValueKind::Float,
        Value::Number(_) => ValueKind::Integer,
        Value::String(_) => ValueKind::String,
        Value::Array(_) => ValueKind::Array,
        Value::Object(_) => ValueKind::Object,
    }
}

#[cfg(test)]
#[path = "document_diff_test.rs"]
mod tests;
