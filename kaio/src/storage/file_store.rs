//! JSON file storage
//!
//! Keeps the state blob at `<dir>/<name>.json`. Writes go to a temp file
//! that is synced and renamed over the target, so a crash mid-write never
//! leaves a truncated blob behind.

use super::StateStorage;
use crate::error::Result;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStorage for JsonFileStorage {
    async fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => {
                tracing::debug!("Read state file {:?} ({} bytes)", self.path, content.len());
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No state file at {:?}", self.path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, blob: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(blob.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;

        tracing::debug!("Wrote state file {:?} ({} bytes)", self.path, blob.len());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!("Removed state file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("file {:?}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path(), "state");

        assert_eq!(storage.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(&temp_dir.path().join("nested"), "state");

        storage.write(r#"{"v":1}"#).await.unwrap();
        storage.write(r#"{"v":2}"#).await.unwrap();

        assert_eq!(storage.read().await.unwrap().as_deref(), Some(r#"{"v":2}"#));
        assert!(!storage.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path(), "state");

        storage.write("{}").await.unwrap();
        storage.clear().await.unwrap();
        storage.clear().await.unwrap();

        assert!(!storage.path().exists());
    }

    #[tokio::test]
    async fn test_unreadable_path_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path(), "state");
        // A directory where the file should be
        std::fs::create_dir(storage.path()).unwrap();

        assert!(storage.read().await.is_err());
        assert!(storage.clear().await.is_err());
    }
}
