//! Database models
//!
//! Rows of the key/value blob table backing `SqliteStorage`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named serialized state blob
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredBlob {
    pub name: String,
    /// JSON-encoded state
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
