use super::{FieldPath, FieldUpdate, RemoteDocument, RemoteFilter, RemoteStore};
use crate::core::{Result, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// An in-memory implementation of [`RemoteStore`] for tests and dry runs.
///
/// Every trait call counts as one remote operation, including failed ones. Whole
/// collections can be switched to fail to exercise error paths.
#[derive(Clone, Default)]
pub struct InMemoryRemoteStore {
    collections: Arc<Mutex<Collections>>,
    failing: Arc<Mutex<BTreeSet<String>>>,
    operations: Arc<AtomicUsize>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trait calls served so far.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Makes every later call on `collection` fail with a remote error.
    pub async fn fail_collection(&self, collection: &str) {
        self.failing.lock().await.insert(collection.to_string());
    }

    /// Seeds a document without counting an operation.
    pub async fn insert(&self, collection: &str, id: &str, document: Value) {
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Reads a document without counting an operation.
    pub async fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .lock()
            .await
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned()
    }

    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    async fn begin(&self, collection: &str) -> Result<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().await.contains(collection) {
            return Err(StoreError::RemoteOperationFailed(format!(
                "collection '{collection}' is unavailable"
            )));
        }
        Ok(())
    }
}

fn set_path(document: &mut Value, path: &FieldPath, value: Value) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        *document = value;
        return Ok(());
    };

    let mut current = document;
    for segment in parents {
        let object = current.as_object_mut().ok_or_else(|| {
            StoreError::RemoteOperationFailed(format!("'{path}' crosses a non-object value"))
        })?;
        current = object
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let object = current.as_object_mut().ok_or_else(|| {
        StoreError::RemoteOperationFailed(format!("'{path}' crosses a non-object value"))
    })?;
    object.insert(last.clone(), value);
    Ok(())
}

fn delete_path(document: &mut Value, path: &FieldPath) {
    let Some((last, parents)) = path.segments().split_last() else {
        return;
    };
    let parent = parents
        .iter()
        .try_fold(document, |current, segment| current.get_mut(segment));
    if let Some(Value::Object(object)) = parent {
        object.remove(last);
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.begin(collection).await?;
        Ok(self.document(collection, id).await)
    }

    async fn save(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        self.begin(collection).await?;
        self.insert(collection, id, document).await;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<()> {
        self.begin(collection).await?;
        let mut collections = self.collections.lock().await;
        let document = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;

        // Apply to a copy so a failing update leaves the document untouched.
        let mut updated = document.clone();
        for update in updates {
            match update {
                FieldUpdate::Set(path, value) => set_path(&mut updated, &path, value)?,
                FieldUpdate::Delete(path) => delete_path(&mut updated, &path),
            }
        }
        *document = updated;
        Ok(())
    }

    async fn query(&self, collection: &str, filters: &[RemoteFilter]) -> Result<Vec<RemoteDocument>> {
        self.begin(collection).await?;
        let collections = self.collections.lock().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(documents
            .iter()
            .filter(|(_, data)| {
                filters
                    .iter()
                    .all(|filter| filter.path.lookup(data) == Some(&filter.value))
            })
            .map(|(id, data)| RemoteDocument {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }
}
