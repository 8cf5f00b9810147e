//! Error types for Kaio
//!
//! All errors use thiserror for structured error handling.
//! Generation failures are split into their own enum so callers can tell
//! a missing credential from a failed request from an unusable payload.

use crate::models::DayName;
use thiserror::Error;

/// Failures of the plan generation service.
///
/// None of these ever leave a partially installed plan behind: the store
/// is only touched after a response has been fully validated.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Credential or endpoint configuration is missing.
    #[error("Generation service is not configured: {0}")]
    Configuration(String),

    /// The service answered with a non-success status.
    #[error("Generation request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    /// The request never produced a response.
    #[error("Generation request could not be sent: {0}")]
    Network(String),

    /// The request did not complete within the configured bound.
    #[error("Generation request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Payload was not parseable as structured data.
    #[error("Generation response is not valid JSON: {0}")]
    MalformedResponse(String),

    /// Payload parsed but did not match the expected plan shape.
    #[error("Generation response failed validation: {0}")]
    SchemaValidation(String),
}

impl GenerationError {
    /// Text suitable for showing to the user.
    ///
    /// Validation detail stays in the logs; only configuration and
    /// transport failures carry specifics the user can act on.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(detail) => format!(
                "The plan generator is not configured: {}. Set OPENROUTER_API_KEY or store the key in the system keyring.",
                detail
            ),
            Self::Transport { status, body } => {
                format!("Plan generation failed ({}): {}", status, body)
            }
            Self::Network(detail) => format!("Plan generation failed: {}", detail),
            Self::Timeout { .. } => {
                "Plan generation took too long. Please try again.".to_string()
            }
            Self::MalformedResponse(_) => {
                "The AI returned invalid JSON format. Please try again.".to_string()
            }
            Self::SchemaValidation(_) => {
                "The AI response didn't match the expected format. Please try again.".to_string()
            }
        }
    }

    /// Network-level and HTTP-status failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Network(_))
    }

    /// Whether retrying without changing configuration can help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("No weekly plan is installed")]
    PlanNotInstalled,

    #[error("Checklist index {index} out of range for {day} ({len} items)")]
    ChecklistIndexOutOfRange {
        day: DayName,
        index: usize,
        len: usize,
    },

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Credential error: {0}")]
    Credential(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
