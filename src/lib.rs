pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod messaging;
pub mod services;
pub mod utils;

pub use error::Error;

// Re-export main components for easier use
pub use db::repositories::{Repositories, SafetyDataSource};
pub use db::MemoryStore;
pub use services::{AnalyticsService, LiveMonitor, ViolationFilter};
