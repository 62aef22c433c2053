//! Store port
//!
//! A hierarchical, path-addressed document store. Paths are `/`-separated
//! keys (`appointments/01J.../status`). Every lifecycle and archive
//! operation is expressed through these primitives.
//!
//! Semantics follow a realtime document tree: writing `null` deletes,
//! empty objects are not kept, and writing at a path replaces whatever was
//! there, including a scalar stored at one of its ancestors.

use axum::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;

/// One write in a multi-path update. `None` deletes the path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathWrite {
    pub path: String,
    pub value: Option<Value>,
}

impl PathWrite {
    pub fn put(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: None,
        }
    }
}

/// Path-addressable document store
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the whole subtree at `path`
    async fn get(&self, path: &str) -> Result<Option<Value>, AppError>;

    /// Replace the value at `path`
    async fn set(&self, path: &str, value: Value) -> Result<(), AppError>;

    /// Merge `fields` into `path`; keys may be nested relative paths
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError>;

    /// Delete the subtree at `path`
    async fn remove(&self, path: &str) -> Result<(), AppError>;

    /// Children of `path` whose `child` (relative path) equals `equals`
    async fn query_by_child(
        &self,
        path: &str,
        child: &str,
        equals: Value,
    ) -> Result<Vec<(String, Value)>, AppError>;

    /// Apply every write or none of them
    async fn write_paths(&self, writes: Vec<PathWrite>) -> Result<(), AppError>;

    /// Atomically increment the integer at `path` and return the new value.
    ///
    /// An absent counter is created with `seed`, which is returned as is.
    async fn increment(&self, path: &str, seed: i64) -> Result<i64, AppError>;
}

/// Normalize a path to its canonical `a/b/c` form.
///
/// Leading and trailing separators are ignored; empty inner segments are
/// rejected.
pub fn normalize_path(path: &str) -> Result<String, AppError> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(AppError::Validation(format!("invalid store path: {}", path)));
        }
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// Join a base path and a child key
pub fn child_path(base: &str, key: &str) -> String {
    let base = base.trim_matches('/');
    let key = key.trim_matches('/');
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", base, key)
    }
}

/// Decode a stored document into a model
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    Ok(serde_json::from_value(value)?)
}

/// Encode a model into a document
pub fn encode<T: serde::Serialize>(model: &T) -> Result<Value, AppError> {
    Ok(serde_json::to_value(model)?)
}

/// Decode every child of a collection node.
///
/// Malformed children are skipped with a warning so one bad record does
/// not hide the rest of a listing.
pub fn decode_children<T: DeserializeOwned>(collection: &str, node: Option<Value>) -> Vec<T> {
    let Some(Value::Object(children)) = node else {
        return Vec::new();
    };

    children
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<T>(value) {
            Ok(model) => Some(model),
            Err(error) => {
                tracing::warn!(
                    collection,
                    key = %key,
                    %error,
                    "Skipping malformed record"
                );
                None
            }
        })
        .collect()
}

/// Decode `(key, value)` rows returned by [`Store::query_by_child`]
pub fn decode_rows<T: DeserializeOwned>(collection: &str, rows: Vec<(String, Value)>) -> Vec<T> {
    let node = Value::Object(rows.into_iter().collect());
    decode_children(collection, Some(node))
}

/// Number of direct children at a node
pub fn count_children(node: &Option<Value>) -> usize {
    match node {
        Some(Value::Object(children)) => children.len(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_trims_separators() {
        assert_eq!(normalize_path("/appointments/a1/").unwrap(), "appointments/a1");
        assert_eq!(normalize_path("").unwrap(), "");
        assert!(normalize_path("appointments//a1").is_err());
    }

    #[test]
    fn child_path_handles_root() {
        assert_eq!(child_path("", "settings"), "settings");
        assert_eq!(child_path("archives/blotter", "xyz"), "archives/blotter/xyz");
    }

    #[test]
    fn decode_children_skips_malformed_records() {
        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }

        let node = serde_json::json!({
            "a": { "name": "first" },
            "b": { "unexpected": true },
        });
        let decoded: Vec<Named> = decode_children("things", Some(node));
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "first");
    }
}
