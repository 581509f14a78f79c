//! File-system capability consumed by the stores.
//!
//! The persistence layer only ever talks to [`FileSystem`]; [`LocalFileSystem`] is the
//! tokio-backed implementation used by the desktop deployment, the CLI and the tests.

use crate::core::{Result, StoreError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// One entry returned by [`FileSystem::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Reads a whole file. A missing file is reported as [`StoreError::NotFound`].
    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replaces the file contents, creating parent directories on demand.
    async fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Appends to the file, creating it (and its parents) if needed.
    async fn append(&self, path: &Path, contents: &str) -> Result<()>;

    async fn ensure_dir(&self, path: &Path) -> Result<()>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Lists the immediate children of a directory, sorted by name.
    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        return StoreError::NotFound(path.display().to_string());
    }
    StoreError::IoError(format!("{action} '{}': {err}", path.display()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .map_err(|err| io_error("Failed to read", path, err))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent).await?;
        }

        let tmp = tmp_path(path);
        fs::write(&tmp, contents.as_bytes())
            .await
            .map_err(|err| io_error("Failed to write temp file", &tmp, err))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|err| io_error("Failed to rename temp file onto", path, err))?;
        Ok(())
    }

    async fn append(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|err| io_error("Failed to open for append", path, err))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|err| io_error("Failed to append to", path, err))?;
        file.flush()
            .await
            .map_err(|err| io_error("Failed to flush", path, err))?;
        Ok(())
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|err| io_error("Failed to create directory", path, err))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path)
            .await
            .map_err(|err| io_error("Failed to stat", path, err))
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>> {
        let mut reader = fs::read_dir(path)
            .await
            .map_err(|err| io_error("Failed to list directory", path, err))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| io_error("Failed to list directory", path, err))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|err| io_error("Failed to stat", &entry.path(), err))?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
