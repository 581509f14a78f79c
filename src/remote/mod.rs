//! Remote document store seam and the per-entity adapter built on it.
//!
//! The remote side is a collection/document store addressed by dotted field paths.
//! [`RemoteStore`] is the narrow client surface the adapters need; the host injects the
//! real client and tests use [`InMemoryRemoteStore`].

pub mod adapter;
pub mod in_memory;

pub use adapter::RemoteAdapter;
pub use in_memory::InMemoryRemoteStore;

use crate::core::{Result, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Dotted path into a remote document, e.g. `items.5` or `meta.lastModified`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn parse(path: &str) -> Result<Self> {
        let segments = path.split('.').map(str::to_string).collect::<Vec<_>>();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(StoreError::PreconditionFailed(format!(
                "invalid field path '{path}'"
            )));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Value at this path, if every segment resolves to an object member.
    pub fn lookup<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(document, |current, segment| current.get(segment))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(FieldPath, Value),
    Delete(FieldPath),
}

/// Equality filter on one field path.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFilter {
    pub path: FieldPath,
    pub value: Value,
}

impl RemoteFilter {
    pub fn equals(path: FieldPath, value: impl Into<Value>) -> Self {
        Self {
            path,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub data: Value,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Creates or fully replaces a document.
    async fn save(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    /// Applies field-path updates to an existing document.
    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<()>;

    /// Documents whose fields equal every filter, ordered by id.
    async fn query(&self, collection: &str, filters: &[RemoteFilter]) -> Result<Vec<RemoteDocument>>;

    async fn delete_field(&self, collection: &str, id: &str, path: FieldPath) -> Result<()> {
        self.update(collection, id, vec![FieldUpdate::Delete(path)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_path_parses_and_looks_up() {
        let path = FieldPath::parse("items.5.timeIn").unwrap();
        let document = json!({"items": {"5": {"timeIn": "08:00"}}});

        assert_eq!(path.to_string(), "items.5.timeIn");
        assert_eq!(path.lookup(&document), Some(&json!("08:00")));
        assert!(FieldPath::parse("items..5").is_err());
    }
}
