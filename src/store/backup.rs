use super::layout::{FileKind, StoreLayout};
use crate::core::{DocumentScope, Result, StoreError};
use crate::document::{BackupDocument, BackupEntry, FieldChange};
use crate::fs::FileSystem;
use crate::records::RecordField;
use chrono::Utc;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{Level, event};

/// Append-only change history, one backup document per entity scope.
///
/// Entries are never rewritten or removed; every append rewrites the whole document
/// with one more entry at the end.
pub struct BackupLog<F> {
    fs: Arc<dyn FileSystem>,
    layout: StoreLayout,
    _field: PhantomData<fn() -> F>,
}

impl<F> Clone for BackupLog<F> {
    fn clone(&self) -> Self {
        Self {
            fs: self.fs.clone(),
            layout: self.layout.clone(),
            _field: PhantomData,
        }
    }
}

impl<F: RecordField> BackupLog<F> {
    pub fn new(fs: Arc<dyn FileSystem>, layout: StoreLayout) -> Self {
        Self {
            fs,
            layout,
            _field: PhantomData,
        }
    }

    /// Reads the backup document, `None` when the scope has never been saved.
    pub async fn read(&self, scope: &DocumentScope) -> Result<Option<BackupDocument<F>>> {
        let path = self.layout.path(scope, FileKind::Backup);
        let text = match self.fs.read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        serde_json::from_str::<BackupDocument<F>>(&text)
            .map(Some)
            .map_err(|err| StoreError::corrupt(path.display(), err))
    }

    /// Pushes one entry stamped with the current time. Empty change sets are ignored.
    pub async fn append(&self, scope: &DocumentScope, changes: Vec<FieldChange<F>>) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        // A corrupt log is surfaced instead of being replaced, so history is never lost.
        let mut document = self
            .read(scope)
            .await?
            .unwrap_or_else(|| BackupDocument::empty(scope));
        document.backups.push(BackupEntry {
            timestamp: Utc::now(),
            changes,
        });
        self.replace(scope, &document).await?;

        event!(
            Level::DEBUG,
            entity = self.layout.entity(),
            scope = %scope,
            entries = document.backups.len(),
            "backup entry appended"
        );
        Ok(())
    }

    /// All entries in storage order.
    pub async fn entries(&self, scope: &DocumentScope) -> Result<Vec<BackupEntry<F>>> {
        Ok(self
            .read(scope)
            .await?
            .map(|document| document.backups)
            .unwrap_or_default())
    }

    /// Entries that touch `item_key`, trimmed to that item's changes, in storage order.
    pub async fn query(&self, scope: &DocumentScope, item_key: &str) -> Result<Vec<BackupEntry<F>>> {
        Ok(self
            .entries(scope)
            .await?
            .iter()
            .filter(|entry| entry.touches(item_key))
            .map(|entry| entry.for_item(item_key))
            .collect())
    }

    /// Overwrites the whole backup document. Only migration uses this directly.
    pub async fn replace(&self, scope: &DocumentScope, document: &BackupDocument<F>) -> Result<()> {
        let path = self.layout.path(scope, FileKind::Backup);
        let json = serde_json::to_string_pretty(document)?;
        self.fs.write(&path, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileSystem;
    use crate::records::AttendanceField;
    use serde_json::Value;
    use tempfile::tempdir;

    fn change(key: &str, field: AttendanceField, new_value: &str) -> FieldChange<AttendanceField> {
        FieldChange {
            item_key: key.to_string(),
            field,
            old_value: Value::Null,
            new_value: Value::from(new_value),
        }
    }

    #[tokio::test]
    async fn append_keeps_prior_entries_in_order() {
        let dir = tempdir().unwrap();
        let log = BackupLog::<AttendanceField>::new(
            Arc::new(LocalFileSystem::new()),
            StoreLayout::new(dir.path(), "attendance"),
        );
        let scope = DocumentScope::month("emp-1", 2024, 6);

        log.append(&scope, vec![change("1", AttendanceField::TimeIn, "08:00")])
            .await
            .unwrap();
        log.append(&scope, vec![change("2", AttendanceField::TimeIn, "09:00")])
            .await
            .unwrap();
        log.append(&scope, Vec::new()).await.unwrap();

        let entries = log.entries(&scope).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].changes[0].item_key, "1");
        assert_eq!(entries[1].changes[0].item_key, "2");

        let for_two = log.query(&scope, "2").await.unwrap();
        assert_eq!(for_two.len(), 1);
        assert_eq!(for_two[0].changes[0].new_value, Value::from("09:00"));
    }

    #[tokio::test]
    async fn corrupt_backup_document_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let fs = Arc::new(LocalFileSystem::new());
        let layout = StoreLayout::new(dir.path(), "attendance");
        let scope = DocumentScope::month("emp-1", 2024, 6);
        let path = layout.path(&scope, FileKind::Backup);
        fs.write(&path, "{ not json").await.unwrap();

        let log = BackupLog::<AttendanceField>::new(fs.clone(), layout);
        let err = log
            .append(&scope, vec![change("1", AttendanceField::TimeIn, "08:00")])
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::CorruptData { .. }));
        assert_eq!(fs.read_to_string(&path).await.unwrap(), "{ not json");
    }
}
