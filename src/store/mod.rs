//! Per-entity persistence: period documents, legacy rows and the backup log.

pub mod alternatives;
pub mod backup;
pub mod codec;
pub mod layout;
pub mod settings;

pub use alternatives::{AlternativeTimesTracker, attendance_store};
pub use backup::BackupLog;
pub use codec::{DocumentCodec, FormatCodec, LegacyBackupRow, LegacyRowCodec};
pub use layout::{FileKind, StoreLayout};
pub use settings::{PinCipher, SettingsStore};

use crate::config::StoreConfig;
use crate::core::{DocumentScope, Result, StorageFormat, StoreError};
use crate::document::{BackupEntry, FieldChange, sort_items};
use crate::fs::FileSystem;
use crate::records::{EntityRecord, FieldMap, RecordField, from_fields, to_fields};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Hook run after a save has written its document and backup entry.
///
/// Observer failures never fail the save; they are logged as partial enrichment
/// failures.
#[async_trait]
pub trait SaveObserver<R: EntityRecord>: Send + Sync {
    async fn after_save(
        &self,
        scope: &DocumentScope,
        changes: &[FieldChange<R::Field>],
    ) -> Result<()>;
}

/// What a save, delete or revert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOutcome {
    pub changed_fields: usize,
    pub created_items: usize,
    pub written: bool,
}

impl SaveOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }
}

pub struct EntityStore<R: EntityRecord> {
    fs: Arc<dyn FileSystem>,
    layout: StoreLayout,
    format: StorageFormat,
    document: DocumentCodec<R>,
    legacy: LegacyRowCodec<R>,
    observers: Vec<Arc<dyn SaveObserver<R>>>,
}

impl<R: EntityRecord> EntityStore<R> {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        let layout = StoreLayout::new(root, R::ENTITY);
        Self {
            document: DocumentCodec::new(fs.clone(), layout.clone()),
            legacy: LegacyRowCodec::new(fs.clone(), layout.clone()),
            fs,
            layout,
            format: StorageFormat::Document,
            observers: Vec::new(),
        }
    }

    pub fn from_config(fs: Arc<dyn FileSystem>, config: &StoreConfig) -> Self {
        Self::new(fs, config.root.clone()).with_format(config.format)
    }

    pub fn with_format(mut self, format: StorageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SaveObserver<R>>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }

    pub fn backups(&self) -> &BackupLog<R::Field> {
        self.document.backups()
    }

    pub fn legacy_codec(&self) -> &LegacyRowCodec<R> {
        &self.legacy
    }

    pub fn document_codec(&self) -> &DocumentCodec<R> {
        &self.document
    }

    fn codec(&self, format: StorageFormat) -> &dyn FormatCodec<R> {
        match format {
            StorageFormat::Document => &self.document,
            StorageFormat::LegacyRows => &self.legacy,
        }
    }

    pub async fn load(&self, scope: &DocumentScope) -> Result<Vec<R>> {
        self.load_with_format(scope, self.format).await
    }

    /// Loads every item of a scope in natural key order.
    ///
    /// The document format falls back to the legacy row file when the document is
    /// missing or unreadable. Nothing on disk loads as an empty list.
    pub async fn load_with_format(
        &self,
        scope: &DocumentScope,
        format: StorageFormat,
    ) -> Result<Vec<R>> {
        scope.validate(R::SCOPE)?;

        if format == StorageFormat::Document {
            match self.document.read_items(scope).await {
                Ok(Some(items)) => return Ok(items),
                Ok(None) => {}
                Err(err @ StoreError::CorruptData { .. }) => {
                    event!(
                        Level::WARN,
                        entity = R::ENTITY,
                        scope = %scope,
                        error = %err,
                        "corrupt document, trying legacy rows"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        match self.legacy.read_items(scope).await {
            Ok(items) => Ok(items.unwrap_or_default()),
            Err(err @ (StoreError::CorruptData { .. } | StoreError::SerializationError(_))) => {
                event!(
                    Level::WARN,
                    entity = R::ENTITY,
                    scope = %scope,
                    error = %err,
                    "unreadable legacy rows, loading empty"
                );
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn load_item(&self, scope: &DocumentScope, item_key: &str) -> Result<Option<R>> {
        Ok(self
            .load(scope)
            .await?
            .into_iter()
            .find(|item| item.item_key() == item_key))
    }

    /// Merges `items` into the stored scope field by field.
    ///
    /// Fields a record leaves unset keep their stored value. The document is rewritten
    /// and one backup entry appended only when at least one field changed.
    pub async fn save_or_update(&self, items: &[R], scope: &DocumentScope) -> Result<SaveOutcome> {
        self.save_or_update_with_format(items, scope, self.format).await
    }

    pub async fn save_or_update_with_format(
        &self,
        items: &[R],
        scope: &DocumentScope,
        format: StorageFormat,
    ) -> Result<SaveOutcome> {
        let patches = items
            .iter()
            .map(|item| Ok((item.item_key(), to_fields(item)?)))
            .collect::<Result<Vec<_>>>()?;
        self.apply_patches(scope, patches, format).await
    }

    /// Merges raw field maps keyed by item key. A `null` value removes the field.
    pub async fn save_fields(
        &self,
        scope: &DocumentScope,
        patches: Vec<(String, FieldMap)>,
    ) -> Result<SaveOutcome> {
        self.apply_patches(scope, patches, self.format).await
    }

    async fn apply_patches(
        &self,
        scope: &DocumentScope,
        patches: Vec<(String, FieldMap)>,
        format: StorageFormat,
    ) -> Result<SaveOutcome> {
        scope.validate(R::SCOPE)?;
        let span = info_span!(
            "store.save",
            entity = R::ENTITY,
            scope = %scope,
            format = %format,
            items = patches.len()
        );

        async move {
            let mut state = self.load_state(scope, format).await?;
            let mut changes = Vec::new();
            let mut created_items = 0;

            for (key, patch) in patches {
                let patch = normalize_patch::<R>(&key, patch)?;
                let stored = state.entry(key.clone()).or_insert_with(|| {
                    created_items += 1;
                    let mut fields = FieldMap::new();
                    fields.insert(R::KEY_FIELD.to_string(), R::key_value(&key));
                    fields
                });
                merge_fields::<R>(&key, stored, patch, &mut changes);
            }

            if changes.is_empty() && created_items == 0 {
                event!(Level::DEBUG, "no field changed, nothing written");
                return Ok(SaveOutcome::unchanged());
            }

            self.write_state(scope, format, state, changes.clone()).await?;
            self.notify(scope, &changes).await;

            event!(Level::INFO, changed = changes.len(), created = created_items, "scope saved");
            Ok(SaveOutcome {
                changed_fields: changes.len(),
                created_items,
                written: true,
            })
        }
        .instrument(span)
        .await
    }

    /// Removes one item and records each of its fields as cleared.
    pub async fn delete_item(&self, scope: &DocumentScope, item_key: &str) -> Result<SaveOutcome> {
        scope.validate(R::SCOPE)?;
        let span = info_span!("store.delete", entity = R::ENTITY, scope = %scope, item = item_key);

        async move {
            let format = self.format;
            let mut state = self.load_state(scope, format).await?;
            let Some(removed) = state.remove(item_key) else {
                event!(Level::DEBUG, "item not stored, nothing deleted");
                return Ok(SaveOutcome::unchanged());
            };

            let changes = removed
                .into_iter()
                .filter(|(name, _)| name != R::KEY_FIELD)
                .filter_map(|(name, old_value)| {
                    R::Field::parse(&name).map(|field| FieldChange {
                        item_key: item_key.to_string(),
                        field,
                        old_value,
                        new_value: Value::Null,
                    })
                })
                .collect::<Vec<_>>();

            self.write_state(scope, format, state, changes.clone()).await?;
            self.notify(scope, &changes).await;
            Ok(SaveOutcome {
                changed_fields: changes.len(),
                created_items: 0,
                written: true,
            })
        }
        .instrument(span)
        .await
    }

    /// Backup entries touching one item, newest first.
    pub async fn history(
        &self,
        scope: &DocumentScope,
        item_key: &str,
    ) -> Result<Vec<BackupEntry<R::Field>>> {
        scope.validate(R::SCOPE)?;
        let mut entries = self.document.backups().query(scope, item_key).await?;
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Re-applies the values an entry wrote, as a fresh save.
    pub async fn revert_to(
        &self,
        scope: &DocumentScope,
        entry: &BackupEntry<R::Field>,
    ) -> Result<SaveOutcome> {
        let mut patches: BTreeMap<String, FieldMap> = BTreeMap::new();
        for change in &entry.changes {
            patches
                .entry(change.item_key.clone())
                .or_default()
                .insert(change.field.name().to_string(), change.new_value.clone());
        }
        self.save_fields(scope, patches.into_iter().collect()).await
    }

    /// Every scope with a document or legacy row file on disk, sorted.
    pub async fn list_scopes(&self) -> Result<Vec<DocumentScope>> {
        let entity_dir = self.layout.entity_dir();
        if !self.fs.exists(&entity_dir).await? {
            return Ok(Vec::new());
        }

        let mut scopes = BTreeSet::new();
        if R::SCOPE.owner_scoped {
            for owner in self.fs.list_dir(&entity_dir).await? {
                if !owner.is_dir {
                    continue;
                }
                let owner_dir = self.layout.scope_dir(Some(&owner.name));
                for period in self.stored_periods(&owner_dir).await? {
                    scopes.insert(DocumentScope::new(Some(owner.name.clone()), period));
                }
            }
        } else {
            for period in self.stored_periods(&entity_dir).await? {
                scopes.insert(DocumentScope::new(None, period));
            }
        }
        Ok(scopes.into_iter().collect())
    }

    async fn stored_periods(&self, dir: &std::path::Path) -> Result<Vec<crate::core::Period>> {
        Ok(self
            .fs
            .list_dir(dir)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| self.layout.parse_file_name(&entry.name))
            .filter(|(period, kind)| {
                matches!(kind, FileKind::Document | FileKind::LegacyRows)
                    && period.granularity() == R::SCOPE.granularity
            })
            .map(|(period, _)| period)
            .collect())
    }

    async fn load_state(
        &self,
        scope: &DocumentScope,
        format: StorageFormat,
    ) -> Result<BTreeMap<String, FieldMap>> {
        self.load_with_format(scope, format)
            .await?
            .iter()
            .map(|item| Ok((item.item_key(), to_fields(item)?)))
            .collect()
    }

    async fn write_state(
        &self,
        scope: &DocumentScope,
        format: StorageFormat,
        state: BTreeMap<String, FieldMap>,
        changes: Vec<FieldChange<R::Field>>,
    ) -> Result<()> {
        let mut items = state
            .into_iter()
            .map(|(key, fields)| from_fields::<R>(&key, fields))
            .collect::<Result<Vec<_>>>()?;
        sort_items(&mut items);

        // Document and backup writes are not transactional.
        let codec = self.codec(format);
        codec.write_items(scope, &items).await?;
        codec.append_backup(scope, changes).await
    }

    async fn notify(&self, scope: &DocumentScope, changes: &[FieldChange<R::Field>]) {
        for observer in &self.observers {
            if let Err(err) = observer.after_save(scope, changes).await {
                let err = StoreError::PartialEnrichmentFailed(err.to_string());
                event!(Level::WARN, entity = R::ENTITY, scope = %scope, error = %err, "save observer failed");
            }
        }
    }
}

/// Brings patch values into the record's canonical JSON form (e.g. `250` vs `250.0`)
/// and drops fields the record does not know.
fn normalize_patch<R: EntityRecord>(key: &str, patch: FieldMap) -> Result<FieldMap> {
    let mut present = FieldMap::new();
    let mut cleared = Vec::new();
    for (name, value) in patch {
        if name == R::KEY_FIELD {
            continue;
        }
        if R::Field::parse(&name).is_none() {
            event!(Level::WARN, entity = R::ENTITY, item = key, field = %name, "ignoring unknown field");
            continue;
        }
        if value.is_null() {
            cleared.push(name);
        } else {
            present.insert(name, value);
        }
    }

    let mut normalized = to_fields(&from_fields::<R>(key, present)?)?;
    normalized.remove(R::KEY_FIELD);
    for name in cleared {
        normalized.insert(name, Value::Null);
    }
    Ok(normalized)
}

fn merge_fields<R: EntityRecord>(
    key: &str,
    stored: &mut FieldMap,
    patch: FieldMap,
    changes: &mut Vec<FieldChange<R::Field>>,
) {
    for (name, new_value) in patch {
        let Some(field) = R::Field::parse(&name) else {
            continue;
        };
        let old_value = stored.get(&name).cloned().unwrap_or(Value::Null);
        if old_value == new_value {
            continue;
        }
        if new_value.is_null() {
            stored.remove(&name);
        } else {
            stored.insert(name, new_value.clone());
        }
        changes.push(FieldChange {
            item_key: key.to_string(),
            field,
            old_value,
            new_value,
        });
    }
}
