use super::{EntityRecord, numeric_key_value, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};
use serde_json::Value;

record_fields! {
    pub enum StatisticsField {
        TotalGrossPay => "totalGrossPay",
        TotalNetPay => "totalNetPay",
        TotalDeductions => "totalDeductions",
        TotalOvertimePay => "totalOvertimePay",
        DaysWorked => "daysWorked",
        EmployeeCount => "employeeCount",
    }
}

/// Company-wide totals for one month, stored in a yearly document keyed by month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    pub month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_gross_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_net_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_deductions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_overtime_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_worked: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
}

impl StatisticsRecord {
    pub fn new(month: u32) -> Self {
        Self {
            month,
            ..Self::default()
        }
    }
}

impl EntityRecord for StatisticsRecord {
    type Field = StatisticsField;

    const ENTITY: &'static str = "statistics";
    const COLLECTION: &'static str = "statistics";
    const KEY_FIELD: &'static str = "month";
    const SCOPE: ScopeShape = ScopeShape::global(PeriodGranularity::Year);

    fn item_key(&self) -> String {
        self.month.to_string()
    }

    fn key_value(key: &str) -> Value {
        numeric_key_value(key)
    }
}
