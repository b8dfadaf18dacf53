//! TradeForge Common Library
//!
//! Shared code for the TradeForge backend services including:
//! - Configuration management
//! - Error types and handling
//! - Shared (public-schema) database connection
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::SharedDb;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
