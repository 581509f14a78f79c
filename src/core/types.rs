use super::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// How finely an entity partitions its documents in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodGranularity {
    Month,
    Year,
    Whole,
}

/// The time slice a document covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    Month { year: i32, month: u32 },
    Year { year: i32 },
    Whole,
}

impl Period {
    pub fn month(year: i32, month: u32) -> Self {
        Self::Month { year, month }
    }

    pub fn granularity(&self) -> PeriodGranularity {
        match self {
            Self::Month { .. } => PeriodGranularity::Month,
            Self::Year { .. } => PeriodGranularity::Year,
            Self::Whole => PeriodGranularity::Whole,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            Self::Month { year, .. } | Self::Year { year } => Some(*year),
            Self::Whole => None,
        }
    }

    pub fn month_number(&self) -> Option<u32> {
        match self {
            Self::Month { month, .. } => Some(*month),
            _ => None,
        }
    }

    /// Builds a period of the requested granularity from optional parts.
    pub fn from_parts(
        granularity: PeriodGranularity,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<Self> {
        match granularity {
            PeriodGranularity::Month => match (year, month) {
                (Some(year), Some(month)) => Ok(Self::Month { year, month }),
                _ => Err(StoreError::InvalidScope(
                    "monthly documents need both year and month".to_string(),
                )),
            },
            PeriodGranularity::Year => year.map(|year| Self::Year { year }).ok_or_else(|| {
                StoreError::InvalidScope("yearly documents need a year".to_string())
            }),
            PeriodGranularity::Whole => Ok(Self::Whole),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month { year, month } => write!(f, "{year}-{month:02}"),
            Self::Year { year } => write!(f, "{year}"),
            Self::Whole => write!(f, "*"),
        }
    }
}

/// The shape of scope an entity accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeShape {
    pub owner_scoped: bool,
    pub granularity: PeriodGranularity,
}

impl ScopeShape {
    pub const fn owned(granularity: PeriodGranularity) -> Self {
        Self {
            owner_scoped: true,
            granularity,
        }
    }

    pub const fn global(granularity: PeriodGranularity) -> Self {
        Self {
            owner_scoped: false,
            granularity,
        }
    }
}

/// Addresses one document: an optional owner plus a period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentScope {
    pub owner: Option<String>,
    pub period: Period,
}

impl DocumentScope {
    pub fn new(owner: Option<String>, period: Period) -> Self {
        Self { owner, period }
    }

    /// Owner-scoped monthly document, the common case.
    pub fn month(owner: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            owner: Some(owner.into()),
            period: Period::month(year, month),
        }
    }

    /// Global monthly document (e.g. holidays).
    pub fn global_month(year: i32, month: u32) -> Self {
        Self {
            owner: None,
            period: Period::month(year, month),
        }
    }

    pub fn global_year(year: i32) -> Self {
        Self {
            owner: None,
            period: Period::Year { year },
        }
    }

    pub fn whole() -> Self {
        Self {
            owner: None,
            period: Period::Whole,
        }
    }

    pub fn from_parts(
        shape: ScopeShape,
        owner: Option<String>,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<Self> {
        let period = Period::from_parts(shape.granularity, year, month)?;
        let owner = if shape.owner_scoped { owner } else { None };
        let scope = Self { owner, period };
        scope.validate(shape)?;
        Ok(scope)
    }

    pub fn validate(&self, shape: ScopeShape) -> Result<()> {
        match (&self.owner, shape.owner_scoped) {
            (None, true) => {
                return Err(StoreError::InvalidScope(format!(
                    "scope {self} is missing an owner id"
                )));
            }
            (Some(owner), true) if owner.trim().is_empty() => {
                return Err(StoreError::InvalidScope("owner id must not be empty".to_string()));
            }
            (Some(owner), false) => {
                return Err(StoreError::InvalidScope(format!(
                    "global documents do not take an owner (got '{owner}')"
                )));
            }
            _ => {}
        }

        if self.period.granularity() != shape.granularity {
            return Err(StoreError::InvalidScope(format!(
                "expected a {:?} period, got {}",
                shape.granularity, self.period
            )));
        }

        if let Period::Month { month, .. } = self.period {
            if !(1..=12).contains(&month) {
                return Err(StoreError::InvalidScope(format!(
                    "month must be within 1..=12, got {month}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for DocumentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{owner}@{}", self.period),
            None => write!(f, "global@{}", self.period),
        }
    }
}

/// On-disk representation a store reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageFormat {
    #[default]
    Document,
    LegacyRows,
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Document => "document",
            Self::LegacyRows => "legacy_rows",
        };
        write!(f, "{label}")
    }
}

/// Which side of the sync a deployment is allowed to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentMode {
    /// Local installation: pushes local documents to the remote store.
    Desktop,
    /// Browser-hosted installation: pulls remote documents down.
    Hosted,
}

/// Orders item keys numerically when both parse as integers, lexically otherwise.
pub fn natural_key_cmp(left: &str, right: &str) -> Ordering {
    match (left.parse::<u64>(), right.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => left.cmp(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order_puts_day_two_before_day_ten() {
        let mut keys = vec!["10", "2", "abc", "1"];
        keys.sort_by(|a, b| natural_key_cmp(a, b));
        assert_eq!(keys, vec!["1", "2", "10", "abc"]);
    }

    #[test]
    fn scope_validation_rejects_owner_on_global_entity() {
        let scope = DocumentScope::month("emp-1", 2024, 6);
        let err = scope
            .validate(ScopeShape::global(PeriodGranularity::Month))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidScope(_)));
    }

    #[test]
    fn scope_validation_rejects_month_thirteen() {
        let scope = DocumentScope::month("emp-1", 2024, 13);
        assert!(scope
            .validate(ScopeShape::owned(PeriodGranularity::Month))
            .is_err());
    }

    #[test]
    fn from_parts_drops_owner_for_global_shapes() {
        let scope = DocumentScope::from_parts(
            ScopeShape::global(PeriodGranularity::Year),
            Some("ignored".to_string()),
            Some(2023),
            None,
        )
        .unwrap();
        assert_eq!(scope, DocumentScope::global_year(2023));
    }
}
