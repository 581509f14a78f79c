//! Read/write strategies for the two on-disk formats.

use super::backup::BackupLog;
use super::layout::{FileKind, StoreLayout};
use crate::core::{DocumentScope, Result, StorageFormat, StoreError};
use crate::document::{FieldChange, PeriodDocument, sort_items};
use crate::fs::FileSystem;
use crate::records::{EntityRecord, FieldMap, RecordField, from_fields, to_fields};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub const LEGACY_BACKUP_HEADER: [&str; 4] = ["timestamp", "itemKey", "field", "value"];

#[async_trait]
pub trait FormatCodec<R: EntityRecord>: Send + Sync {
    fn format(&self) -> StorageFormat;

    fn items_path(&self, scope: &DocumentScope) -> PathBuf;

    /// `Ok(None)` when no file exists for the scope.
    async fn read_items(&self, scope: &DocumentScope) -> Result<Option<Vec<R>>>;

    /// Replaces every item stored for the scope.
    async fn write_items(&self, scope: &DocumentScope, items: &[R]) -> Result<()>;

    async fn append_backup(
        &self,
        scope: &DocumentScope,
        changes: Vec<FieldChange<R::Field>>,
    ) -> Result<()>;
}

/// JSON period documents plus JSON backup documents.
pub struct DocumentCodec<R: EntityRecord> {
    fs: Arc<dyn FileSystem>,
    layout: StoreLayout,
    backups: BackupLog<R::Field>,
}

impl<R: EntityRecord> DocumentCodec<R> {
    pub fn new(fs: Arc<dyn FileSystem>, layout: StoreLayout) -> Self {
        Self {
            backups: BackupLog::new(fs.clone(), layout.clone()),
            fs,
            layout,
        }
    }

    pub fn backups(&self) -> &BackupLog<R::Field> {
        &self.backups
    }

    pub async fn read_document(&self, scope: &DocumentScope) -> Result<Option<PeriodDocument<R>>> {
        let path = self.items_path(scope);
        let text = match self.fs.read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        serde_json::from_str::<PeriodDocument<R>>(&text)
            .map(Some)
            .map_err(|err| StoreError::corrupt(path.display(), err))
    }
}

#[async_trait]
impl<R: EntityRecord> FormatCodec<R> for DocumentCodec<R> {
    fn format(&self) -> StorageFormat {
        StorageFormat::Document
    }

    fn items_path(&self, scope: &DocumentScope) -> PathBuf {
        self.layout.path(scope, FileKind::Document)
    }

    async fn read_items(&self, scope: &DocumentScope) -> Result<Option<Vec<R>>> {
        Ok(self
            .read_document(scope)
            .await?
            .map(PeriodDocument::into_sorted_items))
    }

    async fn write_items(&self, scope: &DocumentScope, items: &[R]) -> Result<()> {
        let document = PeriodDocument::new(scope, items);
        let json = serde_json::to_string_pretty(&document)?;
        self.fs.write(&self.items_path(scope), &json).await
    }

    async fn append_backup(
        &self,
        scope: &DocumentScope,
        changes: Vec<FieldChange<R::Field>>,
    ) -> Result<()> {
        self.backups.append(scope, changes).await
    }
}

/// One row of a legacy backup file: a single field value written at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBackupRow {
    pub timestamp: String,
    pub item_key: String,
    pub field: String,
    #[serde(default)]
    pub value: String,
}

impl LegacyBackupRow {
    /// Legacy files carry either RFC 3339 stamps or epoch milliseconds.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        raw.parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }
}

/// Row-oriented CSV files: a header of field names and one row per item.
pub struct LegacyRowCodec<R: EntityRecord> {
    fs: Arc<dyn FileSystem>,
    layout: StoreLayout,
    _record: std::marker::PhantomData<fn() -> R>,
}

impl<R: EntityRecord> LegacyRowCodec<R> {
    pub fn new(fs: Arc<dyn FileSystem>, layout: StoreLayout) -> Self {
        Self {
            fs,
            layout,
            _record: std::marker::PhantomData,
        }
    }

    pub fn backup_path(&self, scope: &DocumentScope) -> PathBuf {
        self.layout.path(scope, FileKind::LegacyBackup)
    }

    fn header() -> Vec<&'static str> {
        std::iter::once(R::KEY_FIELD)
            .chain(R::Field::ALL.iter().map(|field| field.name()))
            .collect()
    }

    pub async fn read_backup_rows(&self, scope: &DocumentScope) -> Result<Option<Vec<LegacyBackupRow>>> {
        let path = self.backup_path(scope);
        let text = match self.fs.read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let mut rows = Vec::new();
        for row in reader.deserialize::<LegacyBackupRow>() {
            rows.push(row.map_err(|err| StoreError::corrupt(path.display(), err))?);
        }
        Ok(Some(rows))
    }

    /// Decodes one legacy cell into the JSON value the record type would hold.
    ///
    /// The cell is run through the record's own CSV deserializer so numbers, flags and
    /// enum labels come out typed. Cells the record cannot decode stay strings.
    pub fn decode_cell(item_key: &str, field: R::Field, raw: &str) -> Value {
        if raw.is_empty() {
            return Value::Null;
        }

        let decoded = (|| -> Result<Option<Value>> {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record([R::KEY_FIELD, field.name()])?;
            writer.write_record([item_key, raw])?;
            let bytes = writer
                .into_inner()
                .map_err(|err| StoreError::SerializationError(err.to_string()))?;

            let mut reader = csv::Reader::from_reader(bytes.as_slice());
            let Some(record) = reader.deserialize::<R>().next() else {
                return Ok(None);
            };
            let fields = to_fields(&record?)?;
            Ok(fields.get(field.name()).cloned())
        })();

        match decoded {
            Ok(Some(value)) => value,
            _ => Value::String(raw.to_string()),
        }
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl<R: EntityRecord> FormatCodec<R> for LegacyRowCodec<R> {
    fn format(&self) -> StorageFormat {
        StorageFormat::LegacyRows
    }

    fn items_path(&self, scope: &DocumentScope) -> PathBuf {
        self.layout.path(scope, FileKind::LegacyRows)
    }

    /// Rows sharing a key are folded together, later rows winning per field.
    async fn read_items(&self, scope: &DocumentScope) -> Result<Option<Vec<R>>> {
        let path = self.items_path(scope);
        let text = match self.fs.read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut grouped: BTreeMap<String, FieldMap> = BTreeMap::new();
        for row in reader.deserialize::<R>() {
            let record = row.map_err(|err| StoreError::corrupt(path.display(), err))?;
            grouped
                .entry(record.item_key())
                .or_default()
                .extend(to_fields(&record)?);
        }

        let mut items = grouped
            .into_iter()
            .map(|(key, fields)| from_fields::<R>(&key, fields))
            .collect::<Result<Vec<_>>>()?;
        sort_items(&mut items);
        Ok(Some(items))
    }

    async fn write_items(&self, scope: &DocumentScope, items: &[R]) -> Result<()> {
        let header = Self::header();
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&header)?;
        for item in items {
            let fields = to_fields(item)?;
            writer.write_record(header.iter().map(|name| cell(fields.get(*name))))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| StoreError::SerializationError(err.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|err| StoreError::SerializationError(err.to_string()))?;
        self.fs.write(&self.items_path(scope), &text).await
    }

    async fn append_backup(
        &self,
        scope: &DocumentScope,
        changes: Vec<FieldChange<R::Field>>,
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let path = self.backup_path(scope);
        let needs_header = !self.fs.exists(&path).await?;
        let timestamp = Utc::now().to_rfc3339();

        let mut writer = csv::Writer::from_writer(Vec::new());
        if needs_header {
            writer.write_record(LEGACY_BACKUP_HEADER)?;
        }
        for change in &changes {
            writer.write_record([
                timestamp.as_str(),
                change.item_key.as_str(),
                change.field.name(),
                cell(Some(&change.new_value)).as_str(),
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| StoreError::SerializationError(err.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|err| StoreError::SerializationError(err.to_string()))?;
        self.fs.append(&path, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileSystem;
    use crate::records::{
        AttendanceField, AttendanceRecord, CashAdvanceField, CashAdvanceRecord, PaymentSchedule,
    };
    use tempfile::tempdir;

    #[test]
    fn decode_cell_types_values_through_the_record() {
        assert_eq!(
            LegacyRowCodec::<AttendanceRecord>::decode_cell("5", AttendanceField::IsHoliday, "true"),
            Value::Bool(true)
        );
        assert_eq!(
            LegacyRowCodec::<AttendanceRecord>::decode_cell("5", AttendanceField::TimeIn, "08:00"),
            Value::from("08:00")
        );
        assert_eq!(
            LegacyRowCodec::<CashAdvanceRecord>::decode_cell("a1", CashAdvanceField::Amount, "250"),
            serde_json::to_value(250.0_f64).unwrap()
        );
        assert_eq!(
            LegacyRowCodec::<AttendanceRecord>::decode_cell("5", AttendanceField::TimeOut, ""),
            Value::Null
        );
    }

    #[test]
    fn legacy_timestamps_accept_rfc3339_and_millis() {
        let row = |timestamp: &str| LegacyBackupRow {
            timestamp: timestamp.to_string(),
            item_key: "1".to_string(),
            field: "timeIn".to_string(),
            value: "08:00".to_string(),
        };
        assert!(row("2024-06-05T08:00:00Z").parsed_timestamp().is_some());
        assert_eq!(
            row("1717574400000").parsed_timestamp().unwrap().timestamp(),
            1_717_574_400
        );
        assert!(row("yesterday").parsed_timestamp().is_none());
    }

    #[tokio::test]
    async fn legacy_rows_write_then_read_back() {
        let dir = tempdir().unwrap();
        let codec = LegacyRowCodec::<CashAdvanceRecord>::new(
            Arc::new(LocalFileSystem::new()),
            StoreLayout::new(dir.path(), "cashAdvances"),
        );
        let scope = DocumentScope::month("emp-1", 2024, 6);
        let advance = CashAdvanceRecord::request(500.0, "2024-06-02", "medicine", PaymentSchedule::OneTime);

        codec.write_items(&scope, std::slice::from_ref(&advance)).await.unwrap();
        let items = codec.read_items(&scope).await.unwrap().unwrap();

        assert_eq!(items, vec![advance]);
    }

    #[tokio::test]
    async fn duplicate_legacy_rows_fold_into_one_item() {
        let dir = tempdir().unwrap();
        let fs = Arc::new(LocalFileSystem::new());
        let layout = StoreLayout::new(dir.path(), "attendance");
        let scope = DocumentScope::month("emp-1", 2024, 6);
        fs.write(
            &layout.path(&scope, FileKind::LegacyRows),
            "day,timeIn,timeOut\n10,08:00,\n2,07:55,16:00\n10,,17:05\n",
        )
        .await
        .unwrap();

        let codec = LegacyRowCodec::<AttendanceRecord>::new(fs, layout);
        let items = codec.read_items(&scope).await.unwrap().unwrap();

        assert_eq!(
            items,
            vec![
                AttendanceRecord::clocked(2, Some("07:55"), Some("16:00")),
                AttendanceRecord::clocked(10, Some("08:00"), Some("17:05")),
            ]
        );
    }
}
