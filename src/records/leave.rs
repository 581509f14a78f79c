use super::{EntityRecord, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

record_fields! {
    pub enum LeaveField {
        StartDate => "startDate",
        EndDate => "endDate",
        LeaveType => "type",
        Status => "status",
        Reason => "reason",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Sick, vacation, emergency, ...
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub leave_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeaveStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LeaveRecord {
    pub fn request(
        start_date: impl Into<String>,
        end_date: impl Into<String>,
        leave_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_date: Some(start_date.into()),
            end_date: Some(end_date.into()),
            leave_type: Some(leave_type.into()),
            status: Some(LeaveStatus::Pending),
            reason: None,
        }
    }
}

impl EntityRecord for LeaveRecord {
    type Field = LeaveField;

    const ENTITY: &'static str = "leaves";
    const COLLECTION: &'static str = "leaves";
    const KEY_FIELD: &'static str = "id";
    const SCOPE: ScopeShape = ScopeShape::owned(PeriodGranularity::Month);

    fn item_key(&self) -> String {
        self.id.clone()
    }
}
