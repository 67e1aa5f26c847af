//! Library lending server
//!
//! REST JSON API for a small lending library: a catalog of items with
//! stock counts, loans with due dates and a borrowing limit, returns,
//! late-return penalties and their payments.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
