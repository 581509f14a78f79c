use super::access::AccessGuard;
use super::registry::{AdapterContext, EntityRegistry};
use super::status::{EntityStatus, SyncSnapshot, SyncStatus};
use super::SyncAdapter;
use crate::config::SyncConfig;
use crate::core::{DeploymentMode, Result, StoreError};
use crate::fs::FileSystem;
use crate::remote::RemoteStore;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{Instrument, Level, event, info_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Upload,
    Download,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// Clears the running flag however the run ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives one upload or download across the registry, one entity at a time.
///
/// Every precondition is checked before any file or remote access. Entities run in
/// registration order; the first failure stops the run unless `continue_on_error` is
/// set in [`SyncConfig`].
pub struct SyncOrchestrator {
    config: SyncConfig,
    registry: Arc<EntityRegistry>,
    fs: Arc<dyn FileSystem>,
    remote: Arc<dyn RemoteStore>,
    access: Option<Arc<dyn AccessGuard>>,
    status: watch::Sender<SyncSnapshot>,
    running: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(
        config: SyncConfig,
        registry: Arc<EntityRegistry>,
        fs: Arc<dyn FileSystem>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        let (status, _) = watch::channel(SyncSnapshot::default());
        Self {
            config,
            registry,
            fs,
            remote,
            access: None,
            status,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_access_guard(mut self, access: Arc<dyn AccessGuard>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SyncSnapshot {
        self.status.borrow().clone()
    }

    pub async fn start_upload(&self, filter: Option<&[&str]>) -> Result<SyncSnapshot> {
        self.run(SyncDirection::Upload, filter).await
    }

    pub async fn start_download(&self, filter: Option<&[&str]>) -> Result<SyncSnapshot> {
        self.run(SyncDirection::Download, filter).await
    }

    async fn run(&self, direction: SyncDirection, filter: Option<&[&str]>) -> Result<SyncSnapshot> {
        let span = info_span!("sync.run", direction = %direction);
        async move {
            if let Err(err) = self.check_preconditions(direction) {
                return Err(self.reject(err));
            }

            if self
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(self.reject(StoreError::PreconditionFailed(
                    "a sync run is already in progress".to_string(),
                )));
            }
            let _guard = RunGuard(&self.running);

            let adapters = match self.build_adapters(filter) {
                Ok(adapters) => adapters,
                Err(err) => return Err(self.reject(err)),
            };

            self.execute(direction, adapters).await
        }
        .instrument(span)
        .await
    }

    fn check_preconditions(&self, direction: SyncDirection) -> Result<()> {
        if self.config.db_path.is_none() {
            return Err(StoreError::PreconditionFailed(
                "no database path is configured".to_string(),
            ));
        }
        let tenant = self
            .config
            .tenant
            .as_deref()
            .filter(|tenant| !tenant.trim().is_empty())
            .ok_or_else(|| {
                StoreError::PreconditionFailed("no tenant is configured".to_string())
            })?;

        let allowed = match self.config.mode {
            DeploymentMode::Desktop => SyncDirection::Upload,
            DeploymentMode::Hosted => SyncDirection::Download,
        };
        if direction != allowed {
            return Err(StoreError::PreconditionFailed(format!(
                "{direction} is not available in {:?} mode",
                self.config.mode
            )));
        }

        if direction == SyncDirection::Download
            && self.config.remote_tenant.as_deref() != Some(tenant)
        {
            return Err(StoreError::PreconditionFailed(format!(
                "tenant '{tenant}' does not match the remote tenant {:?}",
                self.config.remote_tenant
            )));
        }

        if let Some(access) = &self.access {
            let capability = self.config.required_capability;
            if !access.has_capability(capability) {
                return Err(StoreError::PreconditionFailed(format!(
                    "caller lacks the {capability:?} capability"
                )));
            }
        }
        Ok(())
    }

    fn build_adapters(&self, filter: Option<&[&str]>) -> Result<Vec<Box<dyn SyncAdapter>>> {
        let store = self.config.store_config().ok_or_else(|| {
            StoreError::PreconditionFailed("no database path is configured".to_string())
        })?;
        let context = AdapterContext {
            fs: self.fs.clone(),
            store,
            remote: self.remote.clone(),
            owner: self.config.owner.clone(),
        };

        let mut adapters = Vec::new();
        let mut matched = 0;
        let mut failures = Vec::new();
        for handle in self.registry.handles() {
            if let Some(names) = filter {
                if !names
                    .iter()
                    .any(|name| *name == handle.name() || *name == handle.collection())
                {
                    continue;
                }
            }
            matched += 1;

            if handle.needs_owner() && context.owner.is_none() {
                event!(Level::INFO, entity = handle.name(), "skipped, no owner configured");
                continue;
            }
            match handle.adapter(&context) {
                Ok(adapter) => adapters.push(adapter),
                Err(err) => {
                    event!(Level::WARN, entity = handle.name(), error = %err, "adapter not created");
                    failures.push(format!("{}: {err}", handle.name()));
                }
            }
        }

        if !adapters.is_empty() {
            return Ok(adapters);
        }
        let reason = if matched == 0 {
            match filter {
                Some(names) => format!("no registered entity matches {names:?}"),
                None => "no entities are registered".to_string(),
            }
        } else if !failures.is_empty() {
            format!("no adapter could be created ({})", failures.join("; "))
        } else {
            "every selected entity needs an owner id".to_string()
        };
        Err(StoreError::PreconditionFailed(reason))
    }

    async fn execute(
        &self,
        direction: SyncDirection,
        adapters: Vec<Box<dyn SyncAdapter>>,
    ) -> Result<SyncSnapshot> {
        self.status.send_modify(|snapshot| {
            set_direction(snapshot, direction, SyncStatus::Running);
            snapshot.entities = adapters
                .iter()
                .map(|adapter| EntityStatus::idle(adapter.name()))
                .collect();
            snapshot.last_error = None;
        });

        let mut first_error = None;
        for (index, adapter) in adapters.iter().enumerate() {
            self.set_entity(index, SyncStatus::Running);
            let progress = |message: String| {
                self.status.send_modify(|snapshot| {
                    if let Some(entity) = snapshot.entities.get_mut(index) {
                        entity.progress.push(message);
                    }
                });
            };

            let result = match direction {
                SyncDirection::Upload => adapter.sync_to_remote(&progress).await,
                SyncDirection::Download => adapter.sync_from_remote(&progress).await,
            };

            match result {
                Ok(()) => {
                    self.set_entity(index, SyncStatus::Success);
                    event!(Level::INFO, entity = adapter.name(), "entity synced");
                }
                Err(err) => {
                    event!(Level::ERROR, entity = adapter.name(), error = %err, "entity sync failed");
                    progress(format!("error: {err}"));
                    self.set_entity(index, SyncStatus::Error);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                    if !self.config.continue_on_error {
                        break;
                    }
                }
            }
        }

        let outcome = if first_error.is_some() {
            SyncStatus::Error
        } else {
            SyncStatus::Success
        };
        self.status.send_modify(|snapshot| {
            set_direction(snapshot, direction, outcome);
            snapshot.last_error = first_error.as_ref().map(ToString::to_string);
        });

        match first_error {
            Some(err) => Err(err),
            None => Ok(self.status()),
        }
    }

    fn set_entity(&self, index: usize, status: SyncStatus) {
        self.status.send_modify(|snapshot| {
            if let Some(entity) = snapshot.entities.get_mut(index) {
                entity.status = status;
            }
        });
    }

    /// Records a refused run without touching direction or entity statuses.
    fn reject(&self, err: StoreError) -> StoreError {
        event!(Level::WARN, error = %err, "sync refused");
        self.status.send_modify(|snapshot| {
            snapshot.last_error = Some(err.to_string());
        });
        err
    }
}

fn set_direction(snapshot: &mut SyncSnapshot, direction: SyncDirection, status: SyncStatus) {
    match direction {
        SyncDirection::Upload => snapshot.upload_status = status,
        SyncDirection::Download => snapshot.download_status = status,
    }
}
