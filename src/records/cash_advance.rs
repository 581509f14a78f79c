use super::{EntityRecord, record_fields};
use crate::core::{PeriodGranularity, Result, ScopeShape, StoreError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

record_fields! {
    pub enum CashAdvanceField {
        Amount => "amount",
        RemainingUnpaid => "remainingUnpaid",
        Date => "date",
        Reason => "reason",
        ApprovalStatus => "approvalStatus",
        PaymentSchedule => "paymentSchedule",
        Status => "status",
        InstallmentAmount => "installmentAmount",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentSchedule {
    #[serde(rename = "One-time")]
    OneTime,
    Installment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaymentStatus {
    Unpaid,
    Paid,
}

/// A cash advance against future pay.
///
/// Lifecycle: `Pending -> Approved | Rejected`. Deductions are only accepted while the
/// advance is approved and unpaid; `remaining_unpaid` never goes below zero and the
/// advance flips to [`RepaymentStatus::Paid`] when it reaches zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashAdvanceRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_unpaid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_schedule: Option<PaymentSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RepaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_amount: Option<f64>,
}

impl CashAdvanceRecord {
    pub fn request(
        amount: f64,
        date: impl Into<String>,
        reason: impl Into<String>,
        payment_schedule: PaymentSchedule,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount: Some(amount),
            remaining_unpaid: Some(amount),
            date: Some(date.into()),
            reason: Some(reason.into()),
            approval_status: Some(ApprovalStatus::Pending),
            payment_schedule: Some(payment_schedule),
            status: Some(RepaymentStatus::Unpaid),
            installment_amount: None,
        }
    }

    fn decide(&mut self, decision: ApprovalStatus) -> Result<()> {
        match self.approval_status.unwrap_or(ApprovalStatus::Pending) {
            ApprovalStatus::Pending => {
                self.approval_status = Some(decision);
                Ok(())
            }
            current => Err(StoreError::PreconditionFailed(format!(
                "cash advance '{}' is already {current:?}",
                self.id
            ))),
        }
    }

    pub fn approve(&mut self) -> Result<()> {
        self.decide(ApprovalStatus::Approved)
    }

    pub fn reject(&mut self) -> Result<()> {
        self.decide(ApprovalStatus::Rejected)
    }

    /// Applies a payroll deduction and returns the amount actually taken.
    pub fn apply_deduction(&mut self, amount: f64) -> Result<f64> {
        if self.approval_status != Some(ApprovalStatus::Approved) {
            return Err(StoreError::PreconditionFailed(format!(
                "cash advance '{}' is not approved",
                self.id
            )));
        }
        if self.status == Some(RepaymentStatus::Paid) {
            return Err(StoreError::PreconditionFailed(format!(
                "cash advance '{}' is already paid",
                self.id
            )));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(StoreError::PreconditionFailed(format!(
                "deduction must be a positive amount, got {amount}"
            )));
        }

        let remaining = self.remaining_unpaid.or(self.amount).unwrap_or(0.0);
        let taken = amount.min(remaining);
        let left = (remaining - taken).max(0.0);
        self.remaining_unpaid = Some(left);
        self.status = Some(if left <= f64::EPSILON {
            RepaymentStatus::Paid
        } else {
            RepaymentStatus::Unpaid
        });
        Ok(taken)
    }
}

impl EntityRecord for CashAdvanceRecord {
    type Field = CashAdvanceField;

    const ENTITY: &'static str = "cashAdvances";
    const COLLECTION: &'static str = "cash-advances";
    const KEY_FIELD: &'static str = "id";
    const SCOPE: ScopeShape = ScopeShape::owned(PeriodGranularity::Month);

    fn item_key(&self) -> String {
        self.id.clone()
    }
}
