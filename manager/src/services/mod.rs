// File: manager/src/services/mod.rs

pub mod alert_service;
pub mod cleanup_service;
pub mod job_runner;
pub mod service_status_service;
pub mod usage_stats_service;

pub use alert_service::AlertService;
pub use cleanup_service::CleanupService;
pub use job_runner::{Job, JobReport, JobRunner, JobSummary};
pub use service_status_service::ServiceStatusService;
pub use usage_stats_service::UsageStatsService;
