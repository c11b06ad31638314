pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod gis;
pub mod run_tracker;
pub mod scheduler;
pub mod services;
pub mod stats;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigManager, ServerConfig};
pub use database::Database;
pub use gis::GisClient;
pub use run_tracker::RunTracker;
pub use services::{AlertService, Job, JobReport, JobRunner};
