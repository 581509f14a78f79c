use super::{EntityRecord, record_fields};
use crate::core::{PeriodGranularity, ScopeShape};
use serde::{Deserialize, Serialize};

record_fields! {
    pub enum SettingsField {
        CompanyName => "companyName",
        DbPath => "dbPath",
        PinCode => "pinCode",
        ColumnColors => "columnColors",
        CalculationMode => "calculationMode",
    }
}

/// One section of application settings (keyed by section name, e.g. `general`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    /// Encrypted at rest; see `store::settings::SettingsStore`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_colors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_mode: Option<String>,
}

impl SettingsRecord {
    pub fn section(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            ..Self::default()
        }
    }
}

impl EntityRecord for SettingsRecord {
    type Field = SettingsField;

    const ENTITY: &'static str = "settings";
    const COLLECTION: &'static str = "settings";
    const KEY_FIELD: &'static str = "section";
    const SCOPE: ScopeShape = ScopeShape::global(PeriodGranularity::Whole);

    fn item_key(&self) -> String {
        self.section.clone()
    }
}
