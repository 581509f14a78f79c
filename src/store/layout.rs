use crate::core::{DocumentScope, Period};
use std::path::{Path, PathBuf};

/// The four files a scope can own on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Document,
    LegacyRows,
    Backup,
    LegacyBackup,
}

impl FileKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Document => ".json",
            Self::LegacyRows => ".csv",
            Self::Backup => "_backup.json",
            Self::LegacyBackup => "_backup.csv",
        }
    }

    /// Backup suffixes first so `_backup.json` is never read as a document.
    const PARSE_ORDER: [FileKind; 4] = [
        FileKind::Backup,
        FileKind::LegacyBackup,
        FileKind::Document,
        FileKind::LegacyRows,
    ];
}

/// Path scheme: `{root}/{entity}[/{owner}]/{stem}{suffix}` where the stem is
/// `{year}_{month}_{entity}`, `{year}_{entity}` or `{entity}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
    entity: &'static str,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>, entity: &'static str) -> Self {
        Self {
            root: root.into(),
            entity,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn entity_dir(&self) -> PathBuf {
        self.root.join(self.entity)
    }

    pub fn scope_dir(&self, owner: Option<&str>) -> PathBuf {
        match owner {
            Some(owner) => self.entity_dir().join(owner),
            None => self.entity_dir(),
        }
    }

    fn stem(&self, period: &Period) -> String {
        match period {
            Period::Month { year, month } => format!("{year}_{month}_{}", self.entity),
            Period::Year { year } => format!("{year}_{}", self.entity),
            Period::Whole => self.entity.to_string(),
        }
    }

    pub fn path(&self, scope: &DocumentScope, kind: FileKind) -> PathBuf {
        self.scope_dir(scope.owner.as_deref())
            .join(format!("{}{}", self.stem(&scope.period), kind.suffix()))
    }

    /// Owner-level side files (e.g. alternative time suggestions).
    pub fn owner_file(&self, owner: &str, name: &str) -> PathBuf {
        self.scope_dir(Some(owner)).join(name)
    }

    /// Reverses [`StoreLayout::path`] for a bare file name.
    pub fn parse_file_name(&self, name: &str) -> Option<(Period, FileKind)> {
        for kind in FileKind::PARSE_ORDER {
            let whole = format!("{}{}", self.entity, kind.suffix());
            if name == whole {
                return Some((Period::Whole, kind));
            }

            let suffix = format!("_{}{}", self.entity, kind.suffix());
            let Some(prefix) = name.strip_suffix(&suffix) else {
                continue;
            };
            return parse_period(prefix).map(|period| (period, kind));
        }
        None
    }
}

/// Only canonical stems parse: `2024_06` is rejected because `path` would never
/// produce it.
fn parse_period(prefix: &str) -> Option<Period> {
    let mut parts = prefix.split('_');
    let year = parts.next()?.parse::<i32>().ok()?;
    let period = match (parts.next(), parts.next()) {
        (None, _) => Period::Year { year },
        (Some(month), None) => {
            let month = month.parse::<u32>().ok()?;
            if !(1..=12).contains(&month) {
                return None;
            }
            Period::Month { year, month }
        }
        _ => return None,
    };

    let rendered = match period {
        Period::Month { year, month } => format!("{year}_{month}"),
        Period::Year { year } => year.to_string(),
        Period::Whole => return None,
    };
    (rendered == prefix).then_some(period)
}
