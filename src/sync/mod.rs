//! Upload/download orchestration over the registered entity adapters.

pub mod access;
pub mod orchestrator;
pub mod registry;
pub mod status;

pub use access::{AccessGuard, Capability, StaticAccess};
pub use orchestrator::{SyncDirection, SyncOrchestrator};
pub use registry::{AdapterContext, EntityHandle, EntityRegistry, RecordEntity};
pub use status::{EntityStatus, SyncSnapshot, SyncStatus};

use crate::core::Result;
use async_trait::async_trait;

/// Sink for human-readable progress lines of one entity.
pub type ProgressFn<'a> = dyn Fn(String) + Send + Sync + 'a;

/// One entity's two sync directions.
#[async_trait]
pub trait SyncAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn sync_to_remote(&self, progress: &ProgressFn<'_>) -> Result<()>;

    async fn sync_from_remote(&self, progress: &ProgressFn<'_>) -> Result<()>;
}
