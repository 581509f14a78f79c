use super::{EntityRecord, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

record_fields! {
    pub enum HolidayField {
        Name => "name",
        StartDate => "startDate",
        EndDate => "endDate",
        HolidayType => "type",
        Multiplier => "multiplier",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolidayType {
    Regular,
    Special,
}

/// A company-wide holiday; stored globally per month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub holiday_type: Option<HolidayType>,
    /// Pay multiplier applied to hours worked on the holiday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
}

impl HolidayRecord {
    pub fn new(name: impl Into<String>, start_date: impl Into<String>, holiday_type: HolidayType) -> Self {
        let start_date = start_date.into();
        Self {
            id: Uuid::new_v4().to_string(),
            name: Some(name.into()),
            end_date: Some(start_date.clone()),
            start_date: Some(start_date),
            multiplier: Some(match holiday_type {
                HolidayType::Regular => 2.0,
                HolidayType::Special => 1.3,
            }),
            holiday_type: Some(holiday_type),
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl EntityRecord for HolidayRecord {
    type Field = HolidayField;

    const ENTITY: &'static str = "holidays";
    const COLLECTION: &'static str = "holidays";
    const KEY_FIELD: &'static str = "id";
    const SCOPE: ScopeShape = ScopeShape::global(PeriodGranularity::Month);

    fn item_key(&self) -> String {
        self.id.clone()
    }
}
