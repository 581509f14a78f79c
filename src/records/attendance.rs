use super::{EntityRecord, numeric_key_value, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};
use serde_json::Value;

record_fields! {
    pub enum AttendanceField {
        TimeIn => "timeIn",
        TimeOut => "timeOut",
        Schedule => "schedule",
        IsHoliday => "isHoliday",
        Remarks => "remarks",
    }
}

/// One day of clock-in/clock-out data for an employee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_out: Option<String>,
    /// Scheduled shift, e.g. `08:00-17:00`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_holiday: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl AttendanceRecord {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            ..Self::default()
        }
    }

    pub fn clocked(day: u32, time_in: Option<&str>, time_out: Option<&str>) -> Self {
        Self {
            day,
            time_in: time_in.map(str::to_string),
            time_out: time_out.map(str::to_string),
            ..Self::default()
        }
    }
}

impl EntityRecord for AttendanceRecord {
    type Field = AttendanceField;

    const ENTITY: &'static str = "attendance";
    const COLLECTION: &'static str = "attendance";
    const KEY_FIELD: &'static str = "day";
    const SCOPE: ScopeShape = ScopeShape::owned(PeriodGranularity::Month);

    fn item_key(&self) -> String {
        self.day.to_string()
    }

    fn key_value(key: &str) -> Value {
        numeric_key_value(key)
    }
}
