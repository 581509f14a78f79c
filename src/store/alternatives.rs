use super::layout::StoreLayout;
use super::{EntityStore, SaveObserver};
use crate::config::StoreConfig;
use crate::core::{DocumentScope, Result, StoreError};
use crate::document::FieldChange;
use crate::fs::FileSystem;
use crate::records::{AttendanceField, AttendanceRecord, EntityRecord};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{Level, event};

const ALTERNATIVES_FILE: &str = "alternatives.json";

lazy_static! {
    static ref CLOCK_TIME: Regex = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AlternativeTimes {
    #[serde(default)]
    times: BTreeSet<String>,
}

/// Collects every clock time an owner has ever entered, for quick-pick suggestions.
pub struct AlternativeTimesTracker {
    fs: Arc<dyn FileSystem>,
    layout: StoreLayout,
}

impl AlternativeTimesTracker {
    pub fn new(fs: Arc<dyn FileSystem>, layout: StoreLayout) -> Self {
        Self { fs, layout }
    }

    /// Known times for an owner, sorted. Empty when nothing was recorded yet.
    pub async fn load(&self, owner: &str) -> Result<Vec<String>> {
        Ok(self.read(owner).await?.times.into_iter().collect())
    }

    async fn read(&self, owner: &str) -> Result<AlternativeTimes> {
        let path = self.layout.owner_file(owner, ALTERNATIVES_FILE);
        match self.fs.read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|err| StoreError::corrupt(path.display(), err)),
            Err(err) if err.is_not_found() => Ok(AlternativeTimes::default()),
            Err(err) => Err(err),
        }
    }

    /// Adds `candidates` that look like `HH:MM`; returns how many were new.
    pub async fn record<'a>(
        &self,
        owner: &str,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Result<usize> {
        let fresh = candidates
            .into_iter()
            .filter(|time| CLOCK_TIME.is_match(time))
            .collect::<Vec<_>>();
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut known = self.read(owner).await?;
        let before = known.times.len();
        known.times.extend(fresh.into_iter().map(str::to_string));
        let added = known.times.len() - before;
        if added == 0 {
            return Ok(0);
        }

        let json = serde_json::to_string_pretty(&known)?;
        self.fs
            .write(&self.layout.owner_file(owner, ALTERNATIVES_FILE), &json)
            .await?;
        Ok(added)
    }
}

#[async_trait]
impl SaveObserver<AttendanceRecord> for AlternativeTimesTracker {
    async fn after_save(
        &self,
        scope: &DocumentScope,
        changes: &[FieldChange<AttendanceField>],
    ) -> Result<()> {
        let Some(owner) = scope.owner.as_deref() else {
            return Ok(());
        };

        let times = changes
            .iter()
            .filter(|change| {
                matches!(change.field, AttendanceField::TimeIn | AttendanceField::TimeOut)
            })
            .filter_map(|change| change.new_value.as_str());
        let added = self.record(owner, times).await?;
        if added > 0 {
            event!(Level::DEBUG, owner, added, "alternative times recorded");
        }
        Ok(())
    }
}

/// Attendance store with alternative-time tracking installed when the config asks for it.
pub fn attendance_store(
    fs: Arc<dyn FileSystem>,
    config: &StoreConfig,
) -> EntityStore<AttendanceRecord> {
    let store = EntityStore::from_config(fs.clone(), config);
    if !config.track_alternative_times {
        return store;
    }
    let tracker = AlternativeTimesTracker::new(
        fs,
        StoreLayout::new(config.root.clone(), AttendanceRecord::ENTITY),
    );
    store.with_observer(Arc::new(tracker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileSystem;
    use tempfile::tempdir;

    #[tokio::test]
    async fn only_clock_times_are_kept_sorted_and_deduplicated() {
        let dir = tempdir().unwrap();
        let tracker = AlternativeTimesTracker::new(
            Arc::new(LocalFileSystem::new()),
            StoreLayout::new(dir.path(), "attendance"),
        );

        assert_eq!(tracker.record("emp-1", ["17:00", "08:00", "late", "24:10"]).await.unwrap(), 2);
        assert_eq!(tracker.record("emp-1", ["08:00", "07:45"]).await.unwrap(), 1);

        assert_eq!(
            tracker.load("emp-1").await.unwrap(),
            vec!["07:45".to_string(), "08:00".to_string(), "17:00".to_string()]
        );
        assert!(tracker.load("emp-2").await.unwrap().is_empty());
    }
}
