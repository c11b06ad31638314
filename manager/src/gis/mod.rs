//! REST plumbing for the GIS platform: token generation, log queries,
//! service status lookups and feature-service edits.

pub mod client;
pub mod types;

pub use client::{check_json_success, GisClient};
pub use types::{EditSummary, LogMessage, LogPage, ServiceEntry, ServiceStatus};
