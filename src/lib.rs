// ============================================================================
// payroll_store Library
// ============================================================================

pub mod config;
pub mod core;
pub mod document;
pub mod fs;
pub mod migration;
pub mod records;
pub mod remote;
pub mod store;
pub mod sync;

// Re-export main types for convenience
pub use config::{StoreConfig, SyncConfig};
pub use core::{
    DeploymentMode, DocumentScope, Period, PeriodGranularity, Result, ScopeShape, StorageFormat,
    StoreError,
};
pub use document::{BackupEntry, FieldChange, PeriodDocument};
pub use fs::{FileSystem, LocalFileSystem};
pub use migration::{MigrationReport, Migrator};
pub use records::{EntityRecord, RecordField};
pub use remote::{InMemoryRemoteStore, RemoteAdapter, RemoteStore};
pub use store::{EntityStore, SaveObserver, SaveOutcome};
pub use sync::{
    AccessGuard, Capability, EntityRegistry, SyncDirection, SyncOrchestrator, SyncSnapshot,
    SyncStatus,
};

use crate::records::AttendanceRecord;
use std::sync::Arc;

// ============================================================================
// Workspace handle
// ============================================================================

/// One data root plus the entity registry, the entry point hosts build once.
///
/// # Examples
///
/// ```ignore
/// let workspace = PayrollWorkspace::open(StoreConfig::new("/var/lib/payroll"))?;
/// let report = workspace.migrator().migrate(&workspace.config().root).await?;
/// let attendance = workspace.attendance();
/// ```
#[derive(Clone)]
pub struct PayrollWorkspace {
    fs: Arc<dyn FileSystem>,
    config: StoreConfig,
    registry: Arc<EntityRegistry>,
}

impl PayrollWorkspace {
    /// Opens a workspace on the local disk with every payroll entity registered
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::with_file_system(Arc::new(LocalFileSystem::new()), config)
    }

    pub fn with_file_system(fs: Arc<dyn FileSystem>, config: StoreConfig) -> Result<Self> {
        Ok(Self {
            fs,
            config,
            registry: Arc::new(EntityRegistry::payroll_default()?),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<EntityRegistry> {
        self.registry.clone()
    }

    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }

    /// Store for any entity type, using the workspace's preferred format
    pub fn store<R: EntityRecord>(&self) -> EntityStore<R> {
        EntityStore::from_config(self.fs.clone(), &self.config)
    }

    /// Attendance store with alternative-time tracking as configured
    pub fn attendance(&self) -> EntityStore<AttendanceRecord> {
        store::attendance_store(self.fs.clone(), &self.config)
    }

    pub fn migrator(&self) -> Migrator {
        Migrator::new(self.fs.clone(), self.registry.clone())
    }

    /// Orchestrator over this workspace's registry. `config.db_path` still decides
    /// whether a run may start.
    pub fn orchestrator(&self, config: SyncConfig, remote: Arc<dyn RemoteStore>) -> SyncOrchestrator {
        SyncOrchestrator::new(config, self.registry.clone(), self.fs.clone(), remote)
    }
}
