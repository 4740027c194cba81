pub mod alerts;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

// Re-export main components for easier use
pub use alerts::{create_alert_hub, AlertHub};
pub use db::DatabaseService;
pub use error::Error;
