use super::{FieldPath, FieldUpdate, RemoteFilter, RemoteStore};
use crate::core::{DocumentScope, Period, Result};
use crate::document::PeriodDocument;
use crate::records::{EntityRecord, FieldMap, from_fields, to_fields};
use crate::store::{EntityStore, SaveOutcome};
use crate::sync::{ProgressFn, SyncAdapter};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Level, event};

/// Translates one entity between local period documents and remote documents.
///
/// Single-item uploads merge into the remote document by field path, while
/// [`RemoteAdapter::upload_all`] replaces the remote document wholesale.
pub struct RemoteAdapter<R: EntityRecord> {
    store: Arc<EntityStore<R>>,
    remote: Arc<dyn RemoteStore>,
    owner_filter: Option<String>,
}

fn meta_path(field: &str) -> FieldPath {
    FieldPath::new(["meta", field])
}

fn item_path(item_key: &str) -> FieldPath {
    FieldPath::new(["items", item_key])
}

fn last_modified_now() -> FieldUpdate {
    FieldUpdate::Set(meta_path("lastModified"), Value::String(Utc::now().to_rfc3339()))
}

impl<R: EntityRecord> RemoteAdapter<R> {
    pub fn new(store: Arc<EntityStore<R>>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            remote,
            owner_filter: None,
        }
    }

    /// Restricts bulk sync to one owner. Ignored by global entities.
    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner_filter = owner;
        self
    }

    pub fn store(&self) -> &EntityStore<R> {
        &self.store
    }

    /// Remote document id: `{owner|entity}_{year}_{month}`, `{owner|entity}_{year}` or
    /// `{owner|entity}`.
    pub fn document_id(scope: &DocumentScope) -> String {
        let prefix = scope.owner.as_deref().unwrap_or(R::ENTITY);
        match scope.period {
            Period::Month { year, month } => format!("{prefix}_{year}_{month}"),
            Period::Year { year } => format!("{prefix}_{year}"),
            Period::Whole => prefix.to_string(),
        }
    }

    /// Creates the remote document with `item`, or sets `items.{key}` on an existing one.
    /// The existence check and the write are separate calls: a document created by another
    /// writer in between is overwritten by the create path.
    pub async fn upload_item(&self, scope: &DocumentScope, item: &R) -> Result<()> {
        scope.validate(R::SCOPE)?;
        let id = Self::document_id(scope);

        if self.remote.fetch(R::COLLECTION, &id).await?.is_none() {
            let document = PeriodDocument::new(scope, std::slice::from_ref(item));
            return self
                .remote
                .save(R::COLLECTION, &id, serde_json::to_value(&document)?)
                .await;
        }

        let updates = vec![
            FieldUpdate::Set(item_path(&item.item_key()), Value::Object(to_fields(item)?)),
            last_modified_now(),
        ];
        self.remote.update(R::COLLECTION, &id, updates).await
    }

    /// Overwrites the remote document with exactly `items`.
    pub async fn upload_all(&self, scope: &DocumentScope, items: &[R]) -> Result<()> {
        scope.validate(R::SCOPE)?;
        let document = PeriodDocument::new(scope, items);
        self.remote
            .save(
                R::COLLECTION,
                &Self::document_id(scope),
                serde_json::to_value(&document)?,
            )
            .await
    }

    /// Removes `items.{key}` remotely. A missing remote document is a no-op.
    pub async fn delete_item(&self, scope: &DocumentScope, item_key: &str) -> Result<()> {
        scope.validate(R::SCOPE)?;
        let id = Self::document_id(scope);
        if self.remote.fetch(R::COLLECTION, &id).await?.is_none() {
            return Ok(());
        }
        self.remote
            .update(
                R::COLLECTION,
                &id,
                vec![FieldUpdate::Delete(item_path(item_key)), last_modified_now()],
            )
            .await
    }

    /// Pushes every stored item of a scope, merging into an existing remote document.
    pub async fn upload_scope(&self, scope: &DocumentScope) -> Result<usize> {
        let items = self.store.load(scope).await?;
        if items.is_empty() {
            return Ok(0);
        }

        let id = Self::document_id(scope);
        if self.remote.fetch(R::COLLECTION, &id).await?.is_none() {
            self.upload_all(scope, &items).await?;
            return Ok(items.len());
        }

        let mut updates = items
            .iter()
            .map(|item| {
                Ok(FieldUpdate::Set(
                    item_path(&item.item_key()),
                    Value::Object(to_fields(item)?),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        updates.push(last_modified_now());
        self.remote.update(R::COLLECTION, &id, updates).await?;
        Ok(items.len())
    }

    /// Fetches the remote document for `scope` and merges it into the local store.
    ///
    /// Falls back to a query on `meta.ownerId/year/month` when no document carries the
    /// expected id.
    pub async fn download(&self, scope: &DocumentScope) -> Result<SaveOutcome> {
        scope.validate(R::SCOPE)?;
        let id = Self::document_id(scope);

        let document = match self.remote.fetch(R::COLLECTION, &id).await? {
            Some(document) => Some(document),
            None => {
                let filters = scope_filters(scope);
                if filters.is_empty() {
                    None
                } else {
                    self.remote
                        .query(R::COLLECTION, &filters)
                        .await?
                        .into_iter()
                        .next()
                        .map(|found| found.data)
                }
            }
        };

        match document {
            Some(document) => self.save_remote_document(scope, &document).await,
            None => Ok(SaveOutcome::unchanged()),
        }
    }

    async fn save_remote_document(
        &self,
        scope: &DocumentScope,
        document: &Value,
    ) -> Result<SaveOutcome> {
        let patches = normalize_items::<R>(document);
        if patches.is_empty() {
            return Ok(SaveOutcome::unchanged());
        }
        self.store.save_fields(scope, patches).await
    }

    fn owner_scoped_filter(&self) -> Option<&str> {
        if R::SCOPE.owner_scoped {
            self.owner_filter.as_deref()
        } else {
            None
        }
    }
}

fn scope_filters(scope: &DocumentScope) -> Vec<RemoteFilter> {
    let mut filters = Vec::new();
    if let Some(owner) = &scope.owner {
        filters.push(RemoteFilter::equals(meta_path("ownerId"), owner.as_str()));
    }
    if let Some(year) = scope.period.year() {
        filters.push(RemoteFilter::equals(meta_path("year"), year));
    }
    if let Some(month) = scope.period.month_number() {
        filters.push(RemoteFilter::equals(meta_path("month"), month));
    }
    filters
}

/// Turns the remote `items` map into local field patches.
///
/// The key field is restored from the map key when missing; items the record type
/// cannot decode are skipped.
fn normalize_items<R: EntityRecord>(document: &Value) -> Vec<(String, FieldMap)> {
    let Some(items) = document.get("items").and_then(Value::as_object) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|(key, value)| {
            let Value::Object(fields) = value else {
                event!(Level::WARN, entity = R::ENTITY, item = %key, "remote item is not an object");
                return None;
            };
            let mut fields = fields.clone();
            fields
                .entry(R::KEY_FIELD.to_string())
                .or_insert_with(|| R::key_value(key));

            match from_fields::<R>(key, fields.clone()) {
                Ok(_) => Some((key.clone(), fields)),
                Err(err) => {
                    event!(Level::WARN, entity = R::ENTITY, item = %key, error = %err, "skipping undecodable remote item");
                    None
                }
            }
        })
        .collect()
}

fn remote_scope<R: EntityRecord>(document: &Value) -> Result<DocumentScope> {
    let meta = document.get("meta").cloned().unwrap_or(Value::Null);
    let owner = meta
        .get("ownerId")
        .and_then(Value::as_str)
        .map(str::to_string);
    let year = meta
        .get("year")
        .and_then(Value::as_i64)
        .and_then(|year| i32::try_from(year).ok());
    let month = meta
        .get("month")
        .and_then(Value::as_u64)
        .and_then(|month| u32::try_from(month).ok());
    DocumentScope::from_parts(R::SCOPE, owner, year, month)
}

#[async_trait]
impl<R: EntityRecord> SyncAdapter for RemoteAdapter<R> {
    fn name(&self) -> &'static str {
        R::ENTITY
    }

    async fn sync_to_remote(&self, progress: &ProgressFn<'_>) -> Result<()> {
        let owner = self.owner_scoped_filter();
        let scopes = self
            .store
            .list_scopes()
            .await?
            .into_iter()
            .filter(|scope| owner.is_none() || scope.owner.as_deref() == owner)
            .collect::<Vec<_>>();

        progress(format!("{}: {} local documents", R::ENTITY, scopes.len()));
        for scope in scopes {
            let uploaded = self.upload_scope(&scope).await?;
            progress(format!("{}: uploaded {uploaded} items for {scope}", R::ENTITY));
        }
        Ok(())
    }

    async fn sync_from_remote(&self, progress: &ProgressFn<'_>) -> Result<()> {
        let filters = self
            .owner_scoped_filter()
            .map(|owner| vec![RemoteFilter::equals(meta_path("ownerId"), owner)])
            .unwrap_or_default();
        let documents = self.remote.query(R::COLLECTION, &filters).await?;

        progress(format!("{}: {} remote documents", R::ENTITY, documents.len()));
        for document in documents {
            let scope = match remote_scope::<R>(&document.data) {
                Ok(scope) => scope,
                Err(err) => {
                    event!(Level::WARN, entity = R::ENTITY, id = %document.id, error = %err, "remote document has no usable scope");
                    progress(format!("{}: skipped {} ({err})", R::ENTITY, document.id));
                    continue;
                }
            };
            let outcome = self.save_remote_document(&scope, &document.data).await?;
            progress(format!(
                "{}: downloaded {} ({} fields changed)",
                R::ENTITY,
                document.id,
                outcome.changed_fields
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AttendanceRecord, HolidayRecord, SettingsRecord, StatisticsRecord};

    #[test]
    fn document_ids_follow_scope_shape() {
        assert_eq!(
            RemoteAdapter::<AttendanceRecord>::document_id(&DocumentScope::month("emp-1", 2024, 6)),
            "emp-1_2024_6"
        );
        assert_eq!(
            RemoteAdapter::<HolidayRecord>::document_id(&DocumentScope::global_month(2024, 12)),
            "holidays_2024_12"
        );
        assert_eq!(
            RemoteAdapter::<StatisticsRecord>::document_id(&DocumentScope::global_year(2023)),
            "statistics_2023"
        );
        assert_eq!(
            RemoteAdapter::<SettingsRecord>::document_id(&DocumentScope::whole()),
            "settings"
        );
    }

    #[test]
    fn normalize_restores_keys_and_drops_bad_items() {
        let document = serde_json::json!({
            "items": {
                "4": {"timeIn": "08:00"},
                "x": {"day": "not a day"},
                "7": "oops"
            }
        });
        let patches = normalize_items::<AttendanceRecord>(&document);

        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, "4");
        assert_eq!(patches[0].1["day"], Value::from(4));
    }
}
