//! Serialized shapes of the period document and its backup log.

use crate::core::{DocumentScope, Result, ScopeShape, natural_key_cmp};
use crate::records::{EntityRecord, RecordField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub last_modified: DateTime<Utc>,
}

impl DocumentMeta {
    pub fn for_scope(scope: &DocumentScope, last_modified: DateTime<Utc>) -> Self {
        Self {
            owner_id: scope.owner.clone(),
            year: scope.period.year(),
            month: scope.period.month_number(),
            last_modified,
        }
    }

    /// Recovers the scope a document was written for.
    pub fn scope(&self, shape: ScopeShape) -> Result<DocumentScope> {
        DocumentScope::from_parts(shape, self.owner_id.clone(), self.year, self.month)
    }
}

/// All items of one entity for one owner and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodDocument<R> {
    pub meta: DocumentMeta,
    #[serde(default = "BTreeMap::new")]
    pub items: BTreeMap<String, R>,
}

impl<R: EntityRecord> PeriodDocument<R> {
    pub fn new(scope: &DocumentScope, items: &[R]) -> Self {
        Self {
            meta: DocumentMeta::for_scope(scope, Utc::now()),
            items: items
                .iter()
                .map(|item| (item.item_key(), item.clone()))
                .collect(),
        }
    }

    /// Items in natural key order (day 2 before day 10).
    pub fn into_sorted_items(self) -> Vec<R> {
        let mut items = self.items.into_values().collect::<Vec<_>>();
        sort_items(&mut items);
        items
    }
}

pub fn sort_items<R: EntityRecord>(items: &mut [R]) {
    items.sort_by(|a, b| natural_key_cmp(&a.item_key(), &b.item_key()));
}

/// One field-level change recorded by a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange<F> {
    pub item_key: String,
    pub field: F,
    #[serde(default)]
    pub old_value: Value,
    #[serde(default)]
    pub new_value: Value,
}

/// Changes produced atomically by one save call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry<F> {
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<FieldChange<F>>,
}

impl<F: RecordField> BackupEntry<F> {
    pub fn touches(&self, item_key: &str) -> bool {
        self.changes.iter().any(|change| change.item_key == item_key)
    }

    /// Copy of the entry keeping only the changes for `item_key`.
    pub fn for_item(&self, item_key: &str) -> Self {
        Self {
            timestamp: self.timestamp,
            changes: self
                .changes
                .iter()
                .filter(|change| change.item_key == item_key)
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument<F> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default = "Vec::new")]
    pub backups: Vec<BackupEntry<F>>,
}

impl<F> BackupDocument<F> {
    pub fn empty(scope: &DocumentScope) -> Self {
        Self {
            owner_id: scope.owner.clone(),
            year: scope.period.year(),
            month: scope.period.month_number(),
            backups: Vec::new(),
        }
    }
}
