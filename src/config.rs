use crate::core::{DeploymentMode, StorageFormat};
use crate::sync::Capability;
use std::path::PathBuf;

/// Local store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one sub-directory per entity
    pub root: PathBuf,

    /// Format used when a call does not force one
    pub format: StorageFormat,

    /// Record clock times entered on attendance into the owner's suggestion list
    pub track_alternative_times: bool,
}

impl StoreConfig {
    /// Create a new store configuration rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            format: StorageFormat::Document,
            track_alternative_times: true,
        }
    }

    /// Set the preferred storage format
    pub fn format(mut self, format: StorageFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable alternative time tracking
    pub fn track_alternative_times(mut self, enabled: bool) -> Self {
        self.track_alternative_times = enabled;
        self
    }
}

/// Sync run configuration
///
/// Every field is checked by the orchestrator before a run touches disk or remote.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Local data root; sync refuses to start without one
    pub db_path: Option<PathBuf>,

    /// Tenant this installation belongs to
    pub tenant: Option<String>,

    /// Tenant name configured on the remote side
    pub remote_tenant: Option<String>,

    /// Which direction this deployment may drive
    pub mode: DeploymentMode,

    /// Owner for owner-only entities (payroll)
    pub owner: Option<String>,

    /// Keep syncing later entities after one fails
    pub continue_on_error: bool,

    /// Capability the caller must hold when an access guard is installed
    pub required_capability: Capability,
}

impl SyncConfig {
    /// Create a new sync configuration for a deployment mode
    pub fn new(mode: DeploymentMode) -> Self {
        Self {
            db_path: None,
            tenant: None,
            remote_tenant: None,
            mode,
            owner: None,
            continue_on_error: false,
            required_capability: Capability::ManageSync,
        }
    }

    /// Set the local data root
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Set the local tenant
    pub fn tenant(mut self, tenant: &str) -> Self {
        self.tenant = Some(tenant.to_string());
        self
    }

    /// Set the remote-configured tenant
    pub fn remote_tenant(mut self, tenant: &str) -> Self {
        self.remote_tenant = Some(tenant.to_string());
        self
    }

    /// Set the owner used by owner-only entities
    pub fn owner(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self
    }

    /// Keep going after a failing entity
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// Set the capability checked against the access guard
    pub fn required_capability(mut self, capability: Capability) -> Self {
        self.required_capability = capability;
        self
    }

    /// Store configuration derived from the data root, if one is set
    pub fn store_config(&self) -> Option<StoreConfig> {
        self.db_path.as_ref().map(|root| StoreConfig::new(root.clone()))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DeploymentMode::Desktop)
    }
}
