//! Kaio library
//!
//! Weekly wellness plan tracking: persisted plan state, checklist and
//! grocery bookkeeping, history, and scheduled regeneration of the plan
//! through an external generation service.

pub mod app;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
