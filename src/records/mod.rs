//! Typed item records, one per payroll entity.
//!
//! Every record has exactly one required key field; all other fields are optional so
//! that a record doubles as a partial update (absent field = keep the stored value).

use crate::core::{Result, ScopeShape, StoreError};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::hash::Hash;

pub mod attendance;
pub mod cash_advance;
pub mod compensation;
pub mod holiday;
pub mod leave;
pub mod loan;
pub mod missing_time;
pub mod payroll;
pub mod role;
pub mod settings;
pub mod statistics;

pub use attendance::{AttendanceField, AttendanceRecord};
pub use cash_advance::{
    ApprovalStatus, CashAdvanceField, CashAdvanceRecord, PaymentSchedule, RepaymentStatus,
};
pub use compensation::{CompensationField, CompensationRecord, DayType};
pub use holiday::{HolidayField, HolidayRecord, HolidayType};
pub use leave::{LeaveField, LeaveRecord, LeaveStatus};
pub use loan::{LoanField, LoanRecord, LoanStatus};
pub use missing_time::{MissingTimeField, MissingTimeRecord, MissingTimeType};
pub use payroll::{PayrollField, PayrollRecord};
pub use role::{RoleField, RoleRecord};
pub use settings::{SettingsField, SettingsRecord};
pub use statistics::{StatisticsField, StatisticsRecord};

/// Field map of a record as stored inside a document item.
pub type FieldMap = Map<String, Value>;

/// A typed field name of one record type.
pub trait RecordField:
    Copy + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }
}

/// Declares a field enum whose variants serialize as their camelCase field names.
macro_rules! record_fields {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $crate::records::RecordField for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::records::RecordField::name(*self))
            }
        }
    };
}
pub(crate) use record_fields;

pub trait EntityRecord:
    Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
    type Field: RecordField;

    /// Local directory / file-name segment.
    const ENTITY: &'static str;
    /// Remote collection name.
    const COLLECTION: &'static str;
    /// Serialized name of the key field.
    const KEY_FIELD: &'static str;
    const SCOPE: ScopeShape;

    fn item_key(&self) -> String;

    /// JSON form of an item key when it has to be re-inserted into a field map.
    fn key_value(key: &str) -> Value {
        Value::String(key.to_string())
    }
}

pub(crate) fn numeric_key_value(key: &str) -> Value {
    key.parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(key.to_string()))
}

/// Serializes a record into its field map, omitting absent fields.
pub fn to_fields<R: EntityRecord>(record: &R) -> Result<FieldMap> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::SerializationError(format!(
            "{} record serialized to a non-object value: {other}",
            R::ENTITY
        ))),
    }
}

/// Rebuilds a record from a field map, inserting the key field when it is missing.
pub fn from_fields<R: EntityRecord>(key: &str, mut fields: FieldMap) -> Result<R> {
    if !fields.contains_key(R::KEY_FIELD) {
        fields.insert(R::KEY_FIELD.to_string(), R::key_value(key));
    }
    serde_json::from_value(Value::Object(fields)).map_err(|err| {
        StoreError::SerializationError(format!("decode {} item '{key}': {err}", R::ENTITY))
    })
}
