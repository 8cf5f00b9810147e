//! Storage module
//!
//! Durable storage for the single serialized state blob. The store only
//! talks to [`StateStorage`], so tests and non-durable hosts can swap in
//! [`MemoryStorage`].

pub mod file_store;
pub mod sqlite_store;

pub use file_store::JsonFileStorage;
pub use sqlite_store::SqliteStorage;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// Read/write/clear access to one named state blob
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Returns `None` when nothing has been written yet.
    async fn read(&self) -> Result<Option<String>>;

    async fn write(&self, blob: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    /// Short label for logs
    fn describe(&self) -> String;
}

/// Non-durable storage that lives as long as the process
#[derive(Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an existing blob, as if written by an earlier session.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    pub fn snapshot(&self) -> Option<String> {
        self.blob.lock().map(|b| b.clone()).unwrap_or(None)
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn read(&self) -> Result<Option<String>> {
        Ok(self.snapshot())
    }

    async fn write(&self, blob: &str) -> Result<()> {
        if let Ok(mut slot) = self.blob.lock() {
            *slot = Some(blob.to_string());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if let Ok(mut slot) = self.blob.lock() {
            *slot = None;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
