//! Services module
//!
//! Business logic that coordinates between the persisted store, the
//! generation service and the scheduler.

pub mod affirmations;
pub mod checklist;
pub mod credentials;
pub mod generator;
pub mod grocery;
pub mod history;
pub mod scheduler;
pub mod store;

pub use credentials::CredentialManager;
pub use generator::{OpenRouterGenerator, PlanGenerator, WeeklyPlanResponse};
pub use scheduler::{RegenerationOutcome, Regenerator};
pub use store::PlanStore;
