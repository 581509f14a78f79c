//! One-shot conversion of legacy row files and legacy backups into documents.

use crate::core::{DocumentScope, Result, StoreError, natural_key_cmp};
use crate::document::{BackupDocument, BackupEntry, FieldChange};
use crate::fs::FileSystem;
use crate::records::{EntityRecord, RecordField};
use crate::store::{EntityStore, FileKind, FormatCodec, LegacyRowCodec};
use crate::sync::EntityRegistry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub documents_written: usize,
    pub backups_written: usize,
    pub failures: Vec<MigrationFailure>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, path: PathBuf, err: &StoreError) {
        event!(Level::WARN, path = %path.display(), error = %err, "legacy file not migrated");
        self.failures.push(MigrationFailure {
            path,
            reason: err.to_string(),
        });
    }
}

pub struct Migrator {
    fs: Arc<dyn FileSystem>,
    registry: Arc<EntityRegistry>,
}

impl Migrator {
    pub fn new(fs: Arc<dyn FileSystem>, registry: Arc<EntityRegistry>) -> Self {
        Self { fs, registry }
    }

    /// Migrates every registered entity under `root`.
    pub async fn migrate(&self, root: &Path) -> Result<MigrationReport> {
        let names = self.registry.names();
        self.migrate_entities(root, &names).await
    }

    /// Migrates only the named entities. Unknown names fail before anything is read.
    pub async fn migrate_entities(&self, root: &Path, names: &[&str]) -> Result<MigrationReport> {
        let handles = names
            .iter()
            .map(|name| {
                self.registry.get(name).ok_or_else(|| {
                    StoreError::PreconditionFailed(format!("unknown entity '{name}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let span = info_span!("migration.run", root = %root.display(), entities = handles.len());
        async move {
            let mut report = MigrationReport::default();
            for handle in handles {
                handle.migrate(self.fs.clone(), root, &mut report).await?;
            }
            event!(
                Level::INFO,
                documents = report.documents_written,
                backups = report.backups_written,
                failures = report.failures.len(),
                "migration finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

/// Migrates one entity. Only directory listings abort; file errors land in the report.
pub async fn migrate_entity<R: EntityRecord>(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    report: &mut MigrationReport,
) -> Result<()> {
    let store = EntityStore::<R>::new(fs.clone(), root);
    let layout = store.layout();
    let entity_dir = layout.entity_dir();
    if !fs.exists(&entity_dir).await? {
        return Ok(());
    }

    let owners = if R::SCOPE.owner_scoped {
        fs.list_dir(&entity_dir)
            .await?
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| Some(entry.name))
            .collect()
    } else {
        vec![None]
    };

    for owner in owners {
        let dir = layout.scope_dir(owner.as_deref());
        for entry in fs.list_dir(&dir).await? {
            if entry.is_dir {
                continue;
            }
            let Some((period, kind)) = layout.parse_file_name(&entry.name) else {
                if is_legacy_file_name(layout.entity(), &entry.name) {
                    let path = dir.join(&entry.name);
                    let err = StoreError::corrupt(path.display(), "file name has no canonical period");
                    report.record_failure(path, &err);
                }
                continue;
            };
            if period.granularity() != R::SCOPE.granularity {
                continue;
            }

            let scope = DocumentScope::new(owner.clone(), period);
            let path = dir.join(&entry.name);
            match kind {
                FileKind::LegacyRows => match migrate_rows(&store, &scope).await {
                    Ok(()) => report.documents_written += 1,
                    Err(err) => report.record_failure(path, &err),
                },
                FileKind::LegacyBackup => match migrate_backup(&store, &scope).await {
                    Ok(()) => report.backups_written += 1,
                    Err(err) => report.record_failure(path, &err),
                },
                FileKind::Document | FileKind::Backup => {}
            }
        }
    }
    Ok(())
}

/// Legacy names look like `{period}_{entity}.csv` or `{period}_{entity}_backup.csv`.
fn is_legacy_file_name(entity: &str, name: &str) -> bool {
    name.ends_with(&format!("_{entity}.csv")) || name.ends_with(&format!("_{entity}_backup.csv"))
}

async fn migrate_rows<R: EntityRecord>(store: &EntityStore<R>, scope: &DocumentScope) -> Result<()> {
    let codec = store.legacy_codec();
    let items = codec.read_items(scope).await?.ok_or_else(|| {
        StoreError::NotFound(format!(
            "legacy rows {} disappeared before migration",
            codec.items_path(scope).display()
        ))
    })?;
    store.document_codec().write_items(scope, &items).await
}

/// Legacy backups only kept new values, so every migrated `oldValue` is null.
async fn migrate_backup<R: EntityRecord>(store: &EntityStore<R>, scope: &DocumentScope) -> Result<()> {
    let codec = store.legacy_codec();
    let path = codec.backup_path(scope);
    let rows = codec.read_backup_rows(scope).await?.unwrap_or_default();

    let mut by_time: BTreeMap<DateTime<Utc>, Vec<FieldChange<R::Field>>> = BTreeMap::new();
    for row in rows {
        let timestamp = row.parsed_timestamp().ok_or_else(|| {
            StoreError::corrupt(path.display(), format!("bad timestamp '{}'", row.timestamp))
        })?;
        let Some(field) = R::Field::parse(&row.field) else {
            event!(Level::WARN, path = %path.display(), field = %row.field, "skipping unknown backup field");
            continue;
        };

        let new_value = LegacyRowCodec::<R>::decode_cell(&row.item_key, field, &row.value);
        let changes = by_time.entry(timestamp).or_default();
        match changes
            .iter()
            .position(|change| change.item_key == row.item_key && change.field == field)
        {
            Some(index) => changes[index].new_value = new_value,
            None => changes.push(FieldChange {
                item_key: row.item_key,
                field,
                old_value: serde_json::Value::Null,
                new_value,
            }),
        }
    }

    let mut document = BackupDocument::empty(scope);
    document.backups = by_time
        .into_iter()
        .map(|(timestamp, mut changes)| {
            changes.sort_by(|a, b| natural_key_cmp(&a.item_key, &b.item_key));
            BackupEntry { timestamp, changes }
        })
        .collect();
    store.backups().replace(scope, &document).await
}
