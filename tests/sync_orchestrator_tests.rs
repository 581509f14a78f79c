use payroll_store::records::{AttendanceRecord, HolidayRecord, LeaveRecord};
use payroll_store::sync::StaticAccess;
use payroll_store::{
    Capability, DeploymentMode, DocumentScope, EntityRegistry, EntityStore, InMemoryRemoteStore,
    LocalFileSystem, StoreError, SyncConfig, SyncOrchestrator, SyncStatus,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn orchestrator(config: SyncConfig, remote: &InMemoryRemoteStore) -> SyncOrchestrator {
    SyncOrchestrator::new(
        config,
        Arc::new(EntityRegistry::payroll_default().unwrap()),
        Arc::new(LocalFileSystem::new()),
        Arc::new(remote.clone()),
    )
}

fn desktop(root: &Path) -> SyncConfig {
    SyncConfig::new(DeploymentMode::Desktop)
        .db_path(root)
        .tenant("acme")
}

fn hosted(root: &Path) -> SyncConfig {
    SyncConfig::new(DeploymentMode::Hosted)
        .db_path(root)
        .tenant("acme")
        .remote_tenant("acme")
}

async fn seed_local_data(root: &Path) {
    let fs = Arc::new(LocalFileSystem::new());
    EntityStore::<AttendanceRecord>::new(fs.clone(), root)
        .save_or_update(
            &[AttendanceRecord::clocked(3, Some("08:00"), Some("17:00"))],
            &DocumentScope::month("emp-1", 2024, 6),
        )
        .await
        .unwrap();
    EntityStore::<HolidayRecord>::new(fs.clone(), root)
        .save_or_update(
            &[HolidayRecord {
                name: Some("Independence Day".to_string()),
                ..HolidayRecord::with_id("h-1")
            }],
            &DocumentScope::global_month(2024, 6),
        )
        .await
        .unwrap();
    EntityStore::<LeaveRecord>::new(fs, root)
        .save_or_update(
            &[LeaveRecord {
                id: "l-1".to_string(),
                reason: Some("family".to_string()),
                ..LeaveRecord::default()
            }],
            &DocumentScope::month("emp-1", 2024, 6),
        )
        .await
        .unwrap();
}

const THREE: [&str; 3] = ["attendance", "holidays", "leaves"];

#[tokio::test]
async fn upload_pushes_every_selected_entity() {
    let dir = tempdir().unwrap();
    seed_local_data(dir.path()).await;
    let remote = InMemoryRemoteStore::new();

    let snapshot = orchestrator(desktop(dir.path()), &remote)
        .start_upload(Some(&THREE[..]))
        .await
        .unwrap();

    assert_eq!(snapshot.upload_status, SyncStatus::Success);
    assert_eq!(snapshot.download_status, SyncStatus::Idle);
    assert!(
        snapshot
            .entities
            .iter()
            .all(|entity| entity.status == SyncStatus::Success)
    );
    assert!(remote.document("attendance", "emp-1_2024_6").await.is_some());
    assert!(remote.document("holidays", "holidays_2024_6").await.is_some());
    assert!(remote.document("leaves", "emp-1_2024_6").await.is_some());
}

#[tokio::test]
async fn first_failure_stops_the_run() {
    let dir = tempdir().unwrap();
    seed_local_data(dir.path()).await;
    let remote = InMemoryRemoteStore::new();
    remote.fail_collection("holidays").await;
    let orchestrator = orchestrator(desktop(dir.path()), &remote);

    let err = orchestrator.start_upload(Some(&THREE[..])).await.unwrap_err();
    assert!(matches!(err, StoreError::RemoteOperationFailed(_)));

    let snapshot = orchestrator.status();
    assert_eq!(snapshot.upload_status, SyncStatus::Error);
    assert_eq!(snapshot.entity("attendance").unwrap().status, SyncStatus::Success);
    assert_eq!(snapshot.entity("holidays").unwrap().status, SyncStatus::Error);
    assert_eq!(snapshot.entity("leaves").unwrap().status, SyncStatus::Idle);
    assert!(snapshot.last_error.is_some());
    assert!(remote.document("leaves", "emp-1_2024_6").await.is_none());
}

#[tokio::test]
async fn continue_on_error_runs_the_remaining_entities() {
    let dir = tempdir().unwrap();
    seed_local_data(dir.path()).await;
    let remote = InMemoryRemoteStore::new();
    remote.fail_collection("holidays").await;
    let orchestrator = orchestrator(desktop(dir.path()).continue_on_error(true), &remote);

    assert!(orchestrator.start_upload(Some(&THREE[..])).await.is_err());

    let snapshot = orchestrator.status();
    assert_eq!(snapshot.upload_status, SyncStatus::Error);
    assert_eq!(snapshot.entity("holidays").unwrap().status, SyncStatus::Error);
    assert_eq!(snapshot.entity("leaves").unwrap().status, SyncStatus::Success);
    assert!(remote.document("leaves", "emp-1_2024_6").await.is_some());
}

#[tokio::test]
async fn disallowed_direction_touches_nothing() {
    let dir = tempdir().unwrap();
    let remote = InMemoryRemoteStore::new();
    let orchestrator = orchestrator(desktop(dir.path()).remote_tenant("acme"), &remote);

    let err = orchestrator.start_download(None).await.unwrap_err();

    assert!(matches!(err, StoreError::PreconditionFailed(_)));
    assert_eq!(remote.operation_count(), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    let snapshot = orchestrator.status();
    assert_eq!(snapshot.download_status, SyncStatus::Idle);
    assert!(snapshot.entities.is_empty());
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn download_requires_matching_tenants() {
    let dir = tempdir().unwrap();
    let remote = InMemoryRemoteStore::new();
    let config = SyncConfig::new(DeploymentMode::Hosted)
        .db_path(dir.path())
        .tenant("acme")
        .remote_tenant("globex");

    let err = orchestrator(config, &remote)
        .start_download(None)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::PreconditionFailed(_)));
    assert_eq!(remote.operation_count(), 0);
}

#[tokio::test]
async fn missing_database_path_or_tenant_is_refused() {
    let remote = InMemoryRemoteStore::new();

    let no_path = SyncConfig::new(DeploymentMode::Desktop).tenant("acme");
    assert!(matches!(
        orchestrator(no_path, &remote).start_upload(None).await,
        Err(StoreError::PreconditionFailed(_))
    ));

    let dir = tempdir().unwrap();
    let blank_tenant = SyncConfig::new(DeploymentMode::Desktop)
        .db_path(dir.path())
        .tenant("  ");
    assert!(matches!(
        orchestrator(blank_tenant, &remote).start_upload(None).await,
        Err(StoreError::PreconditionFailed(_))
    ));
    assert_eq!(remote.operation_count(), 0);
}

#[tokio::test]
async fn filter_matching_nothing_is_refused() {
    let dir = tempdir().unwrap();
    let remote = InMemoryRemoteStore::new();
    let orchestrator = orchestrator(desktop(dir.path()), &remote);

    let err = orchestrator
        .start_upload(Some(&["timesheets"][..]))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::PreconditionFailed(reason) if reason.contains("timesheets")));
    assert_eq!(orchestrator.status().upload_status, SyncStatus::Idle);
}

#[tokio::test]
async fn filter_accepts_collection_names() {
    let dir = tempdir().unwrap();
    let remote = InMemoryRemoteStore::new();

    let snapshot = orchestrator(desktop(dir.path()), &remote)
        .start_upload(Some(&["cash-advances", "missingTime"][..]))
        .await
        .unwrap();

    let names = snapshot
        .entities
        .iter()
        .map(|entity| entity.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["cashAdvances", "missingTime"]);
}

#[tokio::test]
async fn owner_only_entities_are_skipped_without_an_owner() {
    let dir = tempdir().unwrap();
    let remote = InMemoryRemoteStore::new();

    let snapshot = orchestrator(desktop(dir.path()), &remote)
        .start_upload(Some(&["attendance", "payroll"][..]))
        .await
        .unwrap();
    assert!(snapshot.entity("payroll").is_none());
    assert!(snapshot.entity("attendance").is_some());

    let err = orchestrator(desktop(dir.path()), &remote)
        .start_upload(Some(&["payroll"][..]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::PreconditionFailed(_)));

    let snapshot = orchestrator(desktop(dir.path()).owner("emp-1"), &remote)
        .start_upload(Some(&["payroll"][..]))
        .await
        .unwrap();
    assert_eq!(snapshot.entity("payroll").unwrap().status, SyncStatus::Success);
}

#[tokio::test]
async fn access_guard_must_grant_the_capability() {
    let dir = tempdir().unwrap();
    let remote = InMemoryRemoteStore::new();

    let denied = orchestrator(desktop(dir.path()), &remote)
        .with_access_guard(Arc::new(StaticAccess::new(vec![Capability::ManageSettings])));
    assert!(matches!(
        denied.start_upload(None).await,
        Err(StoreError::PreconditionFailed(_))
    ));
    assert_eq!(remote.operation_count(), 0);

    let admin = orchestrator(desktop(dir.path()), &remote)
        .with_access_guard(Arc::new(StaticAccess::new(vec![Capability::Admin])));
    assert!(admin.start_upload(None).await.is_ok());
}

#[tokio::test]
async fn hosted_download_merges_remote_documents_and_reports_progress() {
    let dir = tempdir().unwrap();
    let remote = InMemoryRemoteStore::new();
    remote
        .insert(
            "attendance",
            "emp-1_2024_6",
            json!({
                "meta": {"ownerId": "emp-1", "year": 2024, "month": 6, "lastModified": "2024-06-30T17:00:00Z"},
                "items": {"3": {"day": 3, "timeIn": "08:10"}}
            }),
        )
        .await;
    let orchestrator = orchestrator(hosted(dir.path()), &remote);
    let mut updates = orchestrator.subscribe();

    let snapshot = orchestrator
        .start_download(Some(&["attendance"][..]))
        .await
        .unwrap();

    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().download_status, SyncStatus::Success);
    assert!(!snapshot.is_running());
    assert!(!snapshot.entity("attendance").unwrap().progress.is_empty());

    let local = EntityStore::<AttendanceRecord>::new(Arc::new(LocalFileSystem::new()), dir.path())
        .load(&DocumentScope::month("emp-1", 2024, 6))
        .await
        .unwrap();
    assert_eq!(local, vec![AttendanceRecord::clocked(3, Some("08:10"), None)]);
}
