//! Schema for the blob table

use crate::error::Result;
use sqlx::sqlite::SqlitePool;

const CREATE_STORAGE_BLOBS: &str = "CREATE TABLE IF NOT EXISTS storage_blobs (
    name TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Create the `storage_blobs` table. Safe to run on every open.
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_STORAGE_BLOBS).execute(pool).await?;
    tracing::debug!("storage_blobs table ready");
    Ok(())
}
