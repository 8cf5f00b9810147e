/// Credential Manager Service
/// Resolves the plan generation API key from the environment or the OS
/// credential store, and manages the stored copy.
use crate::config::{API_KEY_ENV, KEYRING_API_KEY_ENTRY, KEYRING_SERVICE};
use crate::error::{AppError, GenerationError, Result};
use keyring::Entry;

/// Credential manager for the generation API key
pub struct CredentialManager;

impl CredentialManager {
    /// Resolve the API key: environment variable first, then keyring.
    pub fn get_api_key() -> std::result::Result<String, GenerationError> {
        if let Some(key) = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
        {
            return Ok(key);
        }

        let entry = Entry::new(KEYRING_SERVICE, KEYRING_API_KEY_ENTRY).map_err(|e| {
            GenerationError::Configuration(format!("{} is not set and keyring is unavailable: {}", API_KEY_ENV, e))
        })?;

        entry
            .get_password()
            .map_err(|e| GenerationError::Configuration(format!("{} is not set and no stored key was found: {}", API_KEY_ENV, e)))
    }

    /// Store the API key securely in the OS credential store
    pub fn store_api_key(key: &str) -> Result<()> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_API_KEY_ENTRY)
            .map_err(|e| AppError::Credential(format!("Failed to create keyring entry: {}", e)))?;

        entry
            .set_password(key)
            .map_err(|e| AppError::Credential(format!("Failed to store API key: {}", e)))?;

        tracing::info!("Generation API key stored in credential manager");
        Ok(())
    }

    /// Delete the stored API key
    pub fn delete_api_key() -> Result<()> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_API_KEY_ENTRY)
            .map_err(|e| AppError::Credential(format!("Failed to create keyring entry: {}", e)))?;

        entry
            .delete_credential()
            .map_err(|e| AppError::Credential(format!("Failed to delete API key: {}", e)))?;

        tracing::info!("Generation API key deleted from credential manager");
        Ok(())
    }

    /// Check whether any API key can be resolved
    pub fn has_api_key() -> bool {
        Self::get_api_key().is_ok()
    }
}
