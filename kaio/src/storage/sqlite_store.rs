//! SQLite storage
//!
//! Keeps the state blob as one row of the `storage_blobs` table.

use super::StateStorage;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

#[derive(Clone)]
pub struct SqliteStorage {
    repo: Repository,
    name: String,
}

impl SqliteStorage {
    pub fn new(repo: Repository, name: impl Into<String>) -> Self {
        Self {
            repo,
            name: name.into(),
        }
    }

    /// Open (creating and migrating if needed) the database at `db_path`.
    pub async fn open(db_path: &Path, name: impl Into<String>) -> Result<Self> {
        let pool = create_pool(db_path).await?;
        Ok(Self::new(Repository::new(pool), name))
    }
}

#[async_trait]
impl StateStorage for SqliteStorage {
    async fn read(&self) -> Result<Option<String>> {
        Ok(self.repo.get_blob(&self.name).await?.map(|blob| blob.value))
    }

    async fn write(&self, blob: &str) -> Result<()> {
        self.repo.put_blob(&self.name, blob).await
    }

    async fn clear(&self) -> Result<()> {
        self.repo.delete_blob(&self.name).await
    }

    fn describe(&self) -> String {
        format!("sqlite blob '{}'", self.name)
    }
}
