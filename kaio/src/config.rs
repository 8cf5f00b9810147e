//! Application configuration constants
//!
//! Central location for all configuration constants, limits and defaults
//! used throughout the application, plus the runtime configuration the
//! host binary resolves from its environment.

use std::path::PathBuf;
use std::time::Duration;

// ===== Plan Tracking =====

/// Maximum number of history entries kept; older entries are evicted.
pub const HISTORY_LIMIT: usize = 30;

/// Prefix for store-assigned grocery item ids ("grocery-0", "grocery-1", ...)
pub const GROCERY_ID_PREFIX: &str = "grocery-";

// ===== Scheduler =====

/// How often the host loop asks whether the plan is stale.
pub const POLL_INTERVAL_SECS: u64 = 60;

/// Upper bound on a single generation request (2 minutes).
pub const GENERATION_TIMEOUT_SECS: u64 = 120;

/// Default auto-regeneration weekday (0 = Sunday .. 6 = Saturday)
pub const DEFAULT_REGENERATE_DAY: u8 = 0;

/// Default auto-regeneration time of day
pub const DEFAULT_REGENERATE_TIME: &str = "06:00";

// ===== Persistence =====

/// Name of the single persisted state blob
pub const STORAGE_KEY: &str = "kaio-plan-storage";

/// SQLite database file name inside the data directory
pub const DATABASE_FILE: &str = "kaio.db";

// ===== Generation Service =====

pub const GENERATION_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Environment variable holding the generation API key
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Keyring service/entry used when the env variable is absent
pub const KEYRING_SERVICE: &str = "Kaio";
pub const KEYRING_API_KEY_ENTRY: &str = "openrouter_api_key";

/// Durable storage backend for the state blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Sqlite,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" | "json" => Ok(StorageBackend::File),
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            "memory" | "none" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "Unknown storage backend '{}'. Use 'file', 'sqlite' or 'memory'",
                other
            )),
        }
    }
}

/// Runtime configuration for the host process
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where durable state lives. `None` when no data directory could be found.
    pub data_dir: Option<PathBuf>,
    pub storage: StorageBackend,
    pub model: String,
    pub generation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir().map(|d| d.join("kaio")),
            storage: StorageBackend::File,
            model: DEFAULT_MODEL.to_string(),
            generation_timeout: Duration::from_secs(GENERATION_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from `KAIO_*` environment variables.
    ///
    /// Unparseable values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("KAIO_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = lookup("KAIO_STORAGE") {
            match raw.parse() {
                Ok(backend) => config.storage = backend,
                Err(e) => tracing::warn!("{}; using file storage", e),
            }
        }

        if let Some(model) = lookup("KAIO_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }

        if let Some(secs) = parse_secs(lookup("KAIO_GENERATION_TIMEOUT_SECS"), "KAIO_GENERATION_TIMEOUT_SECS") {
            config.generation_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_secs(lookup("KAIO_POLL_INTERVAL_SECS"), "KAIO_POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(secs);
        }

        config
    }
}

fn parse_secs(raw: Option<String>, key: &str) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            tracing::warn!("{} must be greater than 0, ignoring", key);
            None
        }
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}', ignoring", key, raw);
            None
        }
    }
}
