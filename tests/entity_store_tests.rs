use async_trait::async_trait;
use payroll_store::document::FieldChange;
use payroll_store::fs::{DirEntryInfo, FileSystem, LocalFileSystem};
use payroll_store::records::{
    AttendanceField, AttendanceRecord, CashAdvanceRecord, PaymentSchedule, StatisticsRecord,
};
use payroll_store::store::{SaveObserver, attendance_store};
use payroll_store::{
    DocumentScope, EntityStore, Period, Result, StorageFormat, StoreConfig, StoreError,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

/// Local disk that counts every mutating call.
#[derive(Default)]
struct CountingFileSystem {
    inner: LocalFileSystem,
    writes: AtomicUsize,
}

impl CountingFileSystem {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileSystem for CountingFileSystem {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        self.inner.read_to_string(path).await
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(path, contents).await
    }

    async fn append(&self, path: &Path, contents: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.append(path, contents).await
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        self.inner.ensure_dir(path).await
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>> {
        self.inner.list_dir(path).await
    }
}

fn june(owner: &str) -> DocumentScope {
    DocumentScope::month(owner, 2024, 6)
}

#[tokio::test]
async fn day_five_clock_in_then_clock_out_records_two_entries() {
    let dir = tempdir().unwrap();
    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    let scope = june("emp-1");

    store
        .save_or_update(&[AttendanceRecord::clocked(5, Some("08:00"), None)], &scope)
        .await
        .unwrap();
    store
        .save_or_update(&[AttendanceRecord::clocked(5, None, Some("17:00"))], &scope)
        .await
        .unwrap();

    let entries = store.backups().entries(&scope).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[1].changes,
        vec![FieldChange {
            item_key: "5".to_string(),
            field: AttendanceField::TimeOut,
            old_value: Value::Null,
            new_value: Value::from("17:00"),
        }]
    );

    let history = store.history(&scope, "5").await.unwrap();
    assert_eq!(history[0].changes[0].field, AttendanceField::TimeOut);
    assert_eq!(history[1].changes[0].field, AttendanceField::TimeIn);

    assert!(
        dir.path()
            .join("attendance/emp-1/2024_6_attendance.json")
            .exists()
    );
}

#[tokio::test]
async fn saving_identical_values_twice_writes_once() {
    let dir = tempdir().unwrap();
    let fs = Arc::new(CountingFileSystem::default());
    let store: EntityStore<AttendanceRecord> = EntityStore::new(fs.clone(), dir.path());
    let scope = june("emp-1");
    let day = AttendanceRecord::clocked(2, Some("08:00"), Some("17:00"));

    let first = store.save_or_update(std::slice::from_ref(&day), &scope).await.unwrap();
    let writes_after_first = fs.writes();
    let second = store.save_or_update(std::slice::from_ref(&day), &scope).await.unwrap();

    assert!(first.written);
    assert!(!second.written);
    // document + backup document
    assert_eq!(writes_after_first, 2);
    assert_eq!(fs.writes(), writes_after_first);
    assert_eq!(store.backups().entries(&scope).await.unwrap().len(), 1);
}

#[tokio::test]
async fn items_load_in_natural_day_order() {
    let dir = tempdir().unwrap();
    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    let scope = june("emp-1");

    store
        .save_or_update(
            &[
                AttendanceRecord::clocked(10, Some("08:00"), None),
                AttendanceRecord::clocked(2, Some("08:05"), None),
                AttendanceRecord::clocked(1, Some("07:55"), None),
            ],
            &scope,
        )
        .await
        .unwrap();

    let days = store
        .load(&scope)
        .await
        .unwrap()
        .iter()
        .map(|item| item.day)
        .collect::<Vec<_>>();
    assert_eq!(days, vec![1, 2, 10]);
}

#[tokio::test]
async fn missing_document_falls_back_to_legacy_rows_without_migrating() {
    let dir = tempdir().unwrap();
    let owner_dir = dir.path().join("attendance/emp-1");
    std::fs::create_dir_all(&owner_dir).unwrap();
    std::fs::write(
        owner_dir.join("2024_6_attendance.csv"),
        "day,timeIn,timeOut,isHoliday\n3,08:00,17:00,false\n",
    )
    .unwrap();

    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    let items = store.load(&june("emp-1")).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].time_out.as_deref(), Some("17:00"));
    assert_eq!(items[0].is_holiday, Some(false));
    assert!(!owner_dir.join("2024_6_attendance.json").exists());
}

#[tokio::test]
async fn corrupt_document_falls_back_to_legacy_then_empty() {
    let dir = tempdir().unwrap();
    let owner_dir = dir.path().join("attendance/emp-1");
    std::fs::create_dir_all(&owner_dir).unwrap();
    std::fs::write(owner_dir.join("2024_6_attendance.json"), "{ truncated").unwrap();

    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    assert!(store.load(&june("emp-1")).await.unwrap().is_empty());

    std::fs::write(owner_dir.join("2024_6_attendance.csv"), "day,timeIn\n4,09:00\n").unwrap();
    let items = store.load(&june("emp-1")).await.unwrap();
    assert_eq!(items, vec![AttendanceRecord::clocked(4, Some("09:00"), None)]);
}

#[tokio::test]
async fn nothing_stored_loads_empty() {
    let dir = tempdir().unwrap();
    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    assert!(store.load(&june("nobody")).await.unwrap().is_empty());
    assert!(store.list_scopes().await.unwrap().is_empty());
}

#[tokio::test]
async fn legacy_format_can_be_forced_per_call() {
    let dir = tempdir().unwrap();
    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    let scope = june("emp-1");

    store
        .save_or_update_with_format(
            &[AttendanceRecord::clocked(7, Some("08:00"), Some("16:30"))],
            &scope,
            StorageFormat::LegacyRows,
        )
        .await
        .unwrap();

    let owner_dir = dir.path().join("attendance/emp-1");
    assert!(owner_dir.join("2024_6_attendance.csv").exists());
    assert!(owner_dir.join("2024_6_attendance_backup.csv").exists());
    assert!(!owner_dir.join("2024_6_attendance.json").exists());

    let backup = std::fs::read_to_string(owner_dir.join("2024_6_attendance_backup.csv")).unwrap();
    assert!(backup.starts_with("timestamp,itemKey,field,value"));

    let items = store
        .load_with_format(&scope, StorageFormat::LegacyRows)
        .await
        .unwrap();
    assert_eq!(items, vec![AttendanceRecord::clocked(7, Some("08:00"), Some("16:30"))]);
}

#[tokio::test]
async fn delete_then_revert_restores_the_item() {
    let dir = tempdir().unwrap();
    let store: EntityStore<CashAdvanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    let scope = june("emp-3");
    let advance = CashAdvanceRecord::request(800.0, "2024-06-10", "repairs", PaymentSchedule::Installment);
    let id = advance.id.clone();

    store.save_or_update(std::slice::from_ref(&advance), &scope).await.unwrap();
    let created = store.history(&scope, &id).await.unwrap().remove(0);

    let deleted = store.delete_item(&scope, &id).await.unwrap();
    assert!(deleted.written);
    assert!(store.load_item(&scope, &id).await.unwrap().is_none());

    let removal = store.history(&scope, &id).await.unwrap().remove(0);
    assert!(removal.changes.iter().all(|change| change.new_value.is_null()));

    store.revert_to(&scope, &created).await.unwrap();
    assert_eq!(store.load_item(&scope, &id).await.unwrap(), Some(advance));
    assert_eq!(store.history(&scope, &id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn deleting_a_missing_item_is_a_no_op() {
    let dir = tempdir().unwrap();
    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());

    let outcome = store.delete_item(&june("emp-1"), "9").await.unwrap();
    assert!(!outcome.written);
    assert!(!dir.path().join("attendance").exists());
}

#[tokio::test]
async fn list_scopes_finds_documents_and_legacy_files() {
    let dir = tempdir().unwrap();
    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    store
        .save_or_update(&[AttendanceRecord::clocked(1, Some("08:00"), None)], &june("emp-1"))
        .await
        .unwrap();
    std::fs::write(
        dir.path().join("attendance/emp-1/2024_5_attendance.csv"),
        "day,timeIn\n1,08:00\n",
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("attendance/emp-2")).unwrap();
    std::fs::write(
        dir.path().join("attendance/emp-2/2023_12_attendance.json"),
        "{\"meta\":{\"lastModified\":\"2024-01-01T00:00:00Z\"},\"items\":{}}",
    )
    .unwrap();

    let scopes = store.list_scopes().await.unwrap();
    assert_eq!(
        scopes,
        vec![
            DocumentScope::month("emp-1", 2024, 5),
            DocumentScope::month("emp-1", 2024, 6),
            DocumentScope::month("emp-2", 2023, 12),
        ]
    );
}

#[tokio::test]
async fn yearly_statistics_use_year_files() {
    let dir = tempdir().unwrap();
    let store: EntityStore<StatisticsRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path());
    let scope = DocumentScope::global_year(2023);

    store
        .save_or_update(
            &[StatisticsRecord {
                total_gross_pay: Some(1200.5),
                ..StatisticsRecord::new(3)
            }],
            &scope,
        )
        .await
        .unwrap();

    assert!(dir.path().join("statistics/2023_statistics.json").exists());
    assert_eq!(
        store.list_scopes().await.unwrap(),
        vec![DocumentScope::new(None, Period::Year { year: 2023 })]
    );
}

#[tokio::test]
async fn attendance_save_records_alternative_times() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::new(dir.path());
    let store = attendance_store(Arc::new(LocalFileSystem::new()), &config);
    let scope = june("emp-1");

    store
        .save_or_update(
            &[
                AttendanceRecord::clocked(1, Some("08:00"), Some("17:00")),
                AttendanceRecord::clocked(2, Some("absent"), Some("07:30")),
            ],
            &scope,
        )
        .await
        .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("attendance/emp-1/alternatives.json")).unwrap();
    let parsed: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["times"], serde_json::json!(["07:30", "08:00", "17:00"]));
}

struct FailingObserver;

#[async_trait]
impl SaveObserver<AttendanceRecord> for FailingObserver {
    async fn after_save(
        &self,
        _scope: &DocumentScope,
        _changes: &[FieldChange<AttendanceField>],
    ) -> Result<()> {
        Err(StoreError::IoError("disk full".to_string()))
    }
}

#[tokio::test]
async fn observer_failure_never_fails_the_save() {
    let dir = tempdir().unwrap();
    let store: EntityStore<AttendanceRecord> =
        EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path())
            .with_observer(Arc::new(FailingObserver));

    let outcome = store
        .save_or_update(&[AttendanceRecord::clocked(8, Some("08:00"), None)], &june("emp-1"))
        .await
        .unwrap();

    assert!(outcome.written);
    assert_eq!(store.load(&june("emp-1")).await.unwrap().len(), 1);
}
