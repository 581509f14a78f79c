use super::{EntityRecord, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

record_fields! {
    pub enum PayrollField {
        StartDate => "startDate",
        EndDate => "endDate",
        GrossPay => "grossPay",
        NetPay => "netPay",
        Deductions => "deductions",
        DaysWorked => "daysWorked",
        PaymentDate => "paymentDate",
    }
}

/// Summary of one generated payroll run for an employee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_worked: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<String>,
}

impl PayrollRecord {
    pub fn run(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_date: Some(start_date.into()),
            end_date: Some(end_date.into()),
            ..Self::default()
        }
    }
}

impl EntityRecord for PayrollRecord {
    type Field = PayrollField;

    const ENTITY: &'static str = "payroll";
    const COLLECTION: &'static str = "payroll";
    const KEY_FIELD: &'static str = "id";
    const SCOPE: ScopeShape = ScopeShape::owned(PeriodGranularity::Month);

    fn item_key(&self) -> String {
        self.id.clone()
    }
}
