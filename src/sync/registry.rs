use super::SyncAdapter;
use crate::config::StoreConfig;
use crate::core::{DocumentScope, Result, ScopeShape, StoreError};
use crate::fs::FileSystem;
use crate::migration::{MigrationReport, migrate_entity};
use crate::records::{
    AttendanceRecord, CashAdvanceRecord, CompensationRecord, EntityRecord, HolidayRecord,
    LeaveRecord, LoanRecord, MissingTimeRecord, PayrollRecord, RoleRecord, SettingsRecord,
    StatisticsRecord,
};
use crate::remote::{RemoteAdapter, RemoteStore};
use crate::store::{EntityStore, attendance_store};
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

/// Everything an adapter factory needs to build a store and its remote adapter.
#[derive(Clone)]
pub struct AdapterContext {
    pub fs: Arc<dyn FileSystem>,
    pub store: StoreConfig,
    pub remote: Arc<dyn RemoteStore>,
    pub owner: Option<String>,
}

/// Type-erased entry for one entity.
#[async_trait]
pub trait EntityHandle: Send + Sync {
    fn name(&self) -> &'static str;

    fn collection(&self) -> &'static str;

    fn scope_shape(&self) -> ScopeShape;

    /// Entities that only make sense for a configured owner.
    fn needs_owner(&self) -> bool;

    fn adapter(&self, context: &AdapterContext) -> Result<Box<dyn SyncAdapter>>;

    async fn migrate(
        &self,
        fs: Arc<dyn FileSystem>,
        root: &Path,
        report: &mut MigrationReport,
    ) -> Result<()>;

    async fn load_json(
        &self,
        fs: Arc<dyn FileSystem>,
        config: &StoreConfig,
        scope: &DocumentScope,
    ) -> Result<Value>;

    async fn history_json(
        &self,
        fs: Arc<dyn FileSystem>,
        config: &StoreConfig,
        scope: &DocumentScope,
        item_key: &str,
    ) -> Result<Value>;
}

type StoreFactory<R> = fn(Arc<dyn FileSystem>, &StoreConfig) -> EntityStore<R>;

pub struct RecordEntity<R: EntityRecord> {
    needs_owner: bool,
    build: StoreFactory<R>,
    _record: PhantomData<fn() -> R>,
}

impl<R: EntityRecord> RecordEntity<R> {
    pub fn new() -> Self {
        Self {
            needs_owner: false,
            build: EntityStore::<R>::from_config,
            _record: PhantomData,
        }
    }

    pub fn owner_only(mut self) -> Self {
        self.needs_owner = true;
        self
    }

    pub fn with_factory(mut self, build: StoreFactory<R>) -> Self {
        self.build = build;
        self
    }
}

impl<R: EntityRecord> Default for RecordEntity<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: EntityRecord> EntityHandle for RecordEntity<R> {
    fn name(&self) -> &'static str {
        R::ENTITY
    }

    fn collection(&self) -> &'static str {
        R::COLLECTION
    }

    fn scope_shape(&self) -> ScopeShape {
        R::SCOPE
    }

    fn needs_owner(&self) -> bool {
        self.needs_owner
    }

    fn adapter(&self, context: &AdapterContext) -> Result<Box<dyn SyncAdapter>> {
        if self.needs_owner && context.owner.is_none() {
            return Err(StoreError::PreconditionFailed(format!(
                "{} sync needs an owner id",
                R::ENTITY
            )));
        }
        let store = (self.build)(context.fs.clone(), &context.store);
        Ok(Box::new(
            RemoteAdapter::new(Arc::new(store), context.remote.clone())
                .with_owner(context.owner.clone()),
        ))
    }

    async fn migrate(
        &self,
        fs: Arc<dyn FileSystem>,
        root: &Path,
        report: &mut MigrationReport,
    ) -> Result<()> {
        migrate_entity::<R>(fs, root, report).await
    }

    async fn load_json(
        &self,
        fs: Arc<dyn FileSystem>,
        config: &StoreConfig,
        scope: &DocumentScope,
    ) -> Result<Value> {
        let items = (self.build)(fs, config).load(scope).await?;
        Ok(serde_json::to_value(items)?)
    }

    async fn history_json(
        &self,
        fs: Arc<dyn FileSystem>,
        config: &StoreConfig,
        scope: &DocumentScope,
        item_key: &str,
    ) -> Result<Value> {
        let history = (self.build)(fs, config).history(scope, item_key).await?;
        Ok(serde_json::to_value(history)?)
    }
}

/// Registered entities in sync order, built once at startup.
#[derive(Clone, Default)]
pub struct EntityRegistry {
    handles: Vec<Arc<dyn EntityHandle>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handle: Arc<dyn EntityHandle>) -> Result<()> {
        if self.get(handle.name()).is_some() {
            return Err(StoreError::PreconditionFailed(format!(
                "entity '{}' is already registered",
                handle.name()
            )));
        }
        self.handles.push(handle);
        Ok(())
    }

    pub fn with<H: EntityHandle + 'static>(mut self, handle: H) -> Result<Self> {
        self.register(Arc::new(handle))?;
        Ok(self)
    }

    /// Every payroll entity. Payroll summaries are only synced for a configured owner.
    pub fn payroll_default() -> Result<Self> {
        Self::new()
            .with(RecordEntity::<AttendanceRecord>::new().with_factory(attendance_store))?
            .with(RecordEntity::<CompensationRecord>::new())?
            .with(RecordEntity::<HolidayRecord>::new())?
            .with(RecordEntity::<LeaveRecord>::new())?
            .with(RecordEntity::<LoanRecord>::new())?
            .with(RecordEntity::<CashAdvanceRecord>::new())?
            .with(RecordEntity::<MissingTimeRecord>::new())?
            .with(RecordEntity::<RoleRecord>::new())?
            .with(RecordEntity::<SettingsRecord>::new())?
            .with(RecordEntity::<StatisticsRecord>::new())?
            .with(RecordEntity::<PayrollRecord>::new().owner_only())
    }

    /// Looks up by local entity name or remote collection name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn EntityHandle>> {
        self.handles
            .iter()
            .find(|handle| handle.name() == name || handle.collection() == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handles.iter().map(|handle| handle.name()).collect()
    }

    pub fn handles(&self) -> &[Arc<dyn EntityHandle>] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
