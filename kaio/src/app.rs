//! Application state and initialization
//!
//! Resolves durable storage from the runtime configuration, rehydrates the
//! plan store and wires the regeneration scheduler. All services are made
//! available through [`AppState`].

use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, StorageBackend, DATABASE_FILE, STORAGE_KEY};
use crate::error::Result;
use crate::services::{OpenRouterGenerator, PlanGenerator, PlanStore, Regenerator};
use crate::storage::{JsonFileStorage, MemoryStorage, SqliteStorage, StateStorage};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<PlanStore>>,
    pub regenerator: Regenerator,
}

/// Pick the configured storage backend.
///
/// Any failure to prepare durable storage falls back to memory so the
/// app stays usable for the session.
pub async fn open_storage(config: &AppConfig) -> Arc<dyn StateStorage> {
    if config.storage == StorageBackend::Memory {
        tracing::info!("Using in-memory storage");
        return Arc::new(MemoryStorage::new());
    }

    let Some(dir) = config.data_dir.as_deref() else {
        tracing::warn!("No data directory available, continuing in memory");
        return Arc::new(MemoryStorage::new());
    };

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        tracing::warn!("Failed to create data directory {:?}, continuing in memory: {}", dir, e);
        return Arc::new(MemoryStorage::new());
    }

    tracing::info!("App data directory: {:?}", dir);

    match config.storage {
        StorageBackend::Sqlite => match SqliteStorage::open(&dir.join(DATABASE_FILE), STORAGE_KEY).await {
            Ok(storage) => Arc::new(storage),
            Err(e) => {
                tracing::warn!("Failed to open database, continuing in memory: {}", e);
                Arc::new(MemoryStorage::new())
            }
        },
        _ => Arc::new(JsonFileStorage::new(dir, STORAGE_KEY)),
    }
}

/// Application setup - called once on startup
pub async fn setup(config: &AppConfig) -> Result<AppState> {
    let generator = OpenRouterGenerator::new(config.model.clone(), config.generation_timeout)?;
    setup_with(config, Arc::new(SystemClock), Arc::new(generator)).await
}

/// Setup with an explicit clock and generator
pub async fn setup_with(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
    generator: Arc<dyn PlanGenerator>,
) -> Result<AppState> {
    tracing::info!("Initializing application");

    let storage = open_storage(config).await;
    let store = PlanStore::open(storage, clock).await;
    if !store.is_durable() {
        tracing::warn!("Plan state will not survive a restart");
    }

    let store = Arc::new(Mutex::new(store));
    let regenerator = Regenerator::new(store.clone(), generator, config.generation_timeout);

    tracing::info!("Application initialized successfully");

    Ok(AppState { store, regenerator })
}
