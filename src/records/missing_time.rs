use super::{EntityRecord, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

record_fields! {
    pub enum MissingTimeField {
        EmployeeId => "employeeId",
        EmployeeName => "employeeName",
        Day => "day",
        MissingType => "missingType",
        CreatedAt => "createdAt",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingTimeType {
    TimeIn,
    TimeOut,
}

/// A day on which an employee clocked only one side; stored globally per month so the
/// whole team's gaps can be reviewed together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingTimeRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_type: Option<MissingTimeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl MissingTimeRecord {
    pub fn log(employee_id: impl Into<String>, day: u32, missing_type: MissingTimeType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id: Some(employee_id.into()),
            employee_name: None,
            day: Some(day),
            missing_type: Some(missing_type),
            created_at: Some(Utc::now()),
        }
    }
}

impl EntityRecord for MissingTimeRecord {
    type Field = MissingTimeField;

    const ENTITY: &'static str = "missingTime";
    const COLLECTION: &'static str = "missing-time";
    const KEY_FIELD: &'static str = "id";
    const SCOPE: ScopeShape = ScopeShape::global(PeriodGranularity::Month);

    fn item_key(&self) -> String {
        self.id.clone()
    }
}
