//! Repository layer for database operations
//!
//! Named blob reads, upserts and deletes.

use super::models::*;
use crate::error::Result;
use chrono::Utc;
use sqlx::SqlitePool;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a blob by name
    pub async fn get_blob(&self, name: &str) -> Result<Option<StoredBlob>> {
        let blob = sqlx::query_as::<_, StoredBlob>(
            r#"
            SELECT name, value, updated_at FROM storage_blobs WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(blob)
    }

    /// Insert or replace a blob
    pub async fn put_blob(&self, name: &str, value: &str) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO storage_blobs (name, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored blob: {} ({} bytes)", name, value.len());
        Ok(())
    }

    /// Delete a blob. Deleting a missing blob is not an error.
    pub async fn delete_blob(&self, name: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM storage_blobs WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!("Deleted blob: {} ({} rows)", name, rows);
        Ok(())
    }
}
