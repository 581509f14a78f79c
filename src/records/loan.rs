use super::{EntityRecord, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

record_fields! {
    pub enum LoanField {
        Amount => "amount",
        RemainingBalance => "remainingBalance",
        LoanType => "type",
        Status => "status",
        InterestRate => "interestRate",
        Term => "term",
        MonthlyPayment => "monthlyPayment",
        Date => "date",
        Reason => "reason",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_balance: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub loan_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<f64>,
    /// Number of monthly installments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LoanRecord {
    pub fn new(amount: f64, loan_type: impl Into<String>, term: u32, date: impl Into<String>) -> Self {
        let term = term.max(1);
        Self {
            id: Uuid::new_v4().to_string(),
            amount: Some(amount),
            remaining_balance: Some(amount),
            loan_type: Some(loan_type.into()),
            status: Some(LoanStatus::Pending),
            interest_rate: None,
            term: Some(term),
            monthly_payment: Some(amount / f64::from(term)),
            date: Some(date.into()),
            reason: None,
        }
    }
}

impl EntityRecord for LoanRecord {
    type Field = LoanField;

    const ENTITY: &'static str = "loans";
    const COLLECTION: &'static str = "loans";
    const KEY_FIELD: &'static str = "id";
    const SCOPE: ScopeShape = ScopeShape::owned(PeriodGranularity::Month);

    fn item_key(&self) -> String {
        self.id.clone()
    }
}
