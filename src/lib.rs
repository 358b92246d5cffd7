//! Hardware Lab
//!
//! Hardware lending for hackathon events: organizers own a fixed inventory of
//! hardware types, hackers request units, organizers hand them out and take
//! them back. Pending requests expire when not picked up in time.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult, LendingError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
