use super::{EntityRecord, numeric_key_value, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};
use serde_json::Value;

record_fields! {
    pub enum CompensationField {
        DayType => "dayType",
        HoursWorked => "hoursWorked",
        GrossPay => "grossPay",
        Deductions => "deductions",
        NetPay => "netPay",
        OvertimeMinutes => "overtimeMinutes",
        OvertimePay => "overtimePay",
        UndertimeMinutes => "undertimeMinutes",
        UndertimeDeduction => "undertimeDeduction",
        LateMinutes => "lateMinutes",
        LateDeduction => "lateDeduction",
        HolidayBonus => "holidayBonus",
        NightDifferentialHours => "nightDifferentialHours",
        NightDifferentialPay => "nightDifferentialPay",
        LeaveType => "leaveType",
        LeavePay => "leavePay",
        ManualOverride => "manualOverride",
        Notes => "notes",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayType {
    Regular,
    Holiday,
    Sunday,
}

/// The pay breakdown computed for one day. Values are produced by the pay engine and
/// stored as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationRecord {
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_type: Option<DayType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_worked: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overtime_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undertime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undertime_deduction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_deduction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holiday_bonus: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night_differential_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night_differential_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_override: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CompensationRecord {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            ..Self::default()
        }
    }
}

impl EntityRecord for CompensationRecord {
    type Field = CompensationField;

    const ENTITY: &'static str = "compensation";
    const COLLECTION: &'static str = "compensation";
    const KEY_FIELD: &'static str = "day";
    const SCOPE: ScopeShape = ScopeShape::owned(PeriodGranularity::Month);

    fn item_key(&self) -> String {
        self.day.to_string()
    }

    fn key_value(key: &str) -> Value {
        numeric_key_value(key)
    }
}
