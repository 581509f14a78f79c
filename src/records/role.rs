use super::{EntityRecord, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};

record_fields! {
    pub enum RoleField {
        Name => "name",
        Description => "description",
        Capabilities => "capabilities",
        AccessCodeHash => "accessCodeHash",
    }
}

/// A named access role. Capabilities are stored as a comma-separated list so that the
/// record stays flat in the legacy row format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code_hash: Option<String>,
}

impl RoleRecord {
    pub fn capability_list(&self) -> Vec<&str> {
        self.capabilities
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|cap| !cap.is_empty())
            .collect()
    }
}

impl EntityRecord for RoleRecord {
    type Field = RoleField;

    const ENTITY: &'static str = "roles";
    const COLLECTION: &'static str = "roles";
    const KEY_FIELD: &'static str = "id";
    const SCOPE: ScopeShape = ScopeShape::global(PeriodGranularity::Whole);

    fn item_key(&self) -> String {
        self.id.clone()
    }
}
