//! Gearloan equipment lending server
//!
//! Administrators keep an inventory of borrowable equipment. Borrowers show a
//! QR code for the item they want, an admin scans it and approves the loan,
//! and the borrower's screen follows along by polling a short-lived status.

use std::sync::Arc;

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod qr;
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
