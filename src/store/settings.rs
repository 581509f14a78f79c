use super::{EntityStore, SaveOutcome};
use crate::core::{DocumentScope, Result};
use crate::records::SettingsRecord;
use std::sync::Arc;
use tracing::{Level, event};

pub const GENERAL_SECTION: &str = "general";

/// Encrypts the settings PIN code at rest. The algorithm is supplied by the host.
pub trait PinCipher: Send + Sync {
    fn encrypt(&self, plain: &str) -> Result<String>;
    fn decrypt(&self, cipher_text: &str) -> Result<String>;
}

/// Settings store that never writes a plain-text PIN.
pub struct SettingsStore {
    store: EntityStore<SettingsRecord>,
    cipher: Arc<dyn PinCipher>,
}

impl SettingsStore {
    pub fn new(store: EntityStore<SettingsRecord>, cipher: Arc<dyn PinCipher>) -> Self {
        Self { store, cipher }
    }

    pub fn inner(&self) -> &EntityStore<SettingsRecord> {
        &self.store
    }

    /// Loads a section as stored; `pin_code` stays encrypted.
    pub async fn load(&self, section: &str) -> Result<Option<SettingsRecord>> {
        self.store.load_item(&DocumentScope::whole(), section).await
    }

    /// Saves a section. `pin_code` is ignored here, so a loaded record (whose PIN is
    /// already encrypted) can be edited and saved back; use [`SettingsStore::set_pin`].
    pub async fn save(&self, mut record: SettingsRecord) -> Result<SaveOutcome> {
        if record.pin_code.take().is_some() {
            event!(Level::DEBUG, section = %record.section, "pin code ignored by settings save");
        }
        self.write(record).await
    }

    /// Encrypts `pin` and stores it in the general section.
    pub async fn set_pin(&self, pin: &str) -> Result<SaveOutcome> {
        self.write(SettingsRecord {
            pin_code: Some(self.cipher.encrypt(pin)?),
            ..SettingsRecord::section(GENERAL_SECTION)
        })
        .await
    }

    async fn write(&self, record: SettingsRecord) -> Result<SaveOutcome> {
        self.store
            .save_or_update(std::slice::from_ref(&record), &DocumentScope::whole())
            .await
    }

    /// `false` when no PIN has been set.
    pub async fn verify_pin(&self, candidate: &str) -> Result<bool> {
        let Some(stored) = self
            .load(GENERAL_SECTION)
            .await?
            .and_then(|record| record.pin_code)
        else {
            return Ok(false);
        };
        Ok(self.cipher.decrypt(&stored)? == candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileSystem;
    use tempfile::tempdir;

    struct Reversed;

    impl PinCipher for Reversed {
        fn encrypt(&self, plain: &str) -> Result<String> {
            Ok(plain.chars().rev().collect())
        }

        fn decrypt(&self, cipher_text: &str) -> Result<String> {
            Ok(cipher_text.chars().rev().collect())
        }
    }

    #[tokio::test]
    async fn pin_is_stored_encrypted_and_verifies() {
        let dir = tempdir().unwrap();
        let settings = SettingsStore::new(
            EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path()),
            Arc::new(Reversed),
        );

        assert!(!settings.verify_pin("1234").await.unwrap());
        settings.set_pin("1234").await.unwrap();

        let stored = settings.load(GENERAL_SECTION).await.unwrap().unwrap();
        assert_eq!(stored.pin_code.as_deref(), Some("4321"));
        assert!(settings.verify_pin("1234").await.unwrap());
        assert!(!settings.verify_pin("0000").await.unwrap());

        let on_disk = std::fs::read_to_string(dir.path().join("settings/settings.json")).unwrap();
        assert!(!on_disk.contains("\"1234\""));
    }

    #[tokio::test]
    async fn editing_a_loaded_section_keeps_the_pin_verifiable() {
        let dir = tempdir().unwrap();
        let settings = SettingsStore::new(
            EntityStore::new(Arc::new(LocalFileSystem::new()), dir.path()),
            Arc::new(Reversed),
        );
        settings.set_pin("1234").await.unwrap();

        let mut loaded = settings.load(GENERAL_SECTION).await.unwrap().unwrap();
        loaded.company_name = Some("Acme Payroll".to_string());
        settings.save(loaded).await.unwrap();

        let stored = settings.load(GENERAL_SECTION).await.unwrap().unwrap();
        assert_eq!(stored.company_name.as_deref(), Some("Acme Payroll"));
        assert_eq!(stored.pin_code.as_deref(), Some("4321"));
        assert!(settings.verify_pin("1234").await.unwrap());
    }
}
