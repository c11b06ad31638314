//! Cron-based scheduling of the stats jobs
//!
//! - Usage stats: once per server with `usage_stats_enabled`
//! - Service status: once per server with `service_status_enabled`
//! - Clean up: once for all servers
//!
//! Schedules use 6-field cron expressions (sec min hour day month dow) and
//! are defined in `config/main.toml`:
//!
//! ```toml
//! [schedules]
//! usage_stats = "0 */15 * * * *"     # every 15 minutes
//! service_status = "0 */5 * * * *"   # every 5 minutes
//! clean_up = "0 30 2 * * *"          # daily at 02:30
//! ```
//!
//! Every firing goes through [`JobRunner`](crate::services::JobRunner), so a
//! firing that overlaps a run still in progress is skipped.

pub mod operations;
pub use operations::{validate_6_field_cron, StatsScheduler};
