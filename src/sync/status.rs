use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityStatus {
    pub name: String,
    pub status: SyncStatus,
    pub progress: Vec<String>,
}

impl EntityStatus {
    pub fn idle(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: SyncStatus::Idle,
            progress: Vec::new(),
        }
    }
}

/// Process-local view of the last (or current) sync run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub upload_status: SyncStatus,
    pub download_status: SyncStatus,
    pub entities: Vec<EntityStatus>,
    pub last_error: Option<String>,
}

impl SyncSnapshot {
    pub fn entity(&self, name: &str) -> Option<&EntityStatus> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn is_running(&self) -> bool {
        self.upload_status == SyncStatus::Running || self.download_status == SyncStatus::Running
    }
}
