//! Central repository for timeouts, limits and default configuration values
//!
//! Constants are grouped by category so the REST client, the jobs and the
//! configuration defaults share a single source of truth.

use std::time::Duration;

/// HTTP client constants
pub mod http {
    use super::Duration;

    /// Default timeout for requests to the GIS server and portal
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Timeout for establishing connections
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Log query constants
pub mod logs {
    /// Message code written by the server when a service is requested
    pub const SERVICE_REQUESTED_CODE: i64 = 9029;

    /// Marker preceding the service name in a service-requested message
    pub const SERVICE_MARKER: &str = "Service: ";

    /// Message logged when a map image export (a layer draw) finishes
    pub const END_EXPORT_MAP_IMAGE: &str = "End ExportMapImage";

    /// Log message type for errors
    pub const TYPE_SEVERE: &str = "SEVERE";

    /// Log message type for warnings
    pub const TYPE_WARNING: &str = "WARNING";

    /// Upper bound on batches fetched for a single window
    pub const MAX_LOG_PAGES: usize = 500;

    /// Filter sent with every log query
    pub const LOG_FILTER: &str = r#"{"services":"*","server":"*","machines":"*"}"#;
}

/// Service state constants
pub mod service_state {
    pub const STARTED: &str = "STARTED";
}

/// Alert system constants
pub mod alerts {
    /// Webhook request timeout
    pub const WEBHOOK_TIMEOUT_SECONDS: u64 = 10;
}

/// Cleanup constants
pub mod cleanup {
    /// Hours after which a run still marked active is considered stuck
    pub const STALE_RUN_HOURS: i64 = 6;

    /// Interval between stale run sweeps
    pub const CLEANUP_INTERVAL_SECONDS: u64 = 3600;
}

/// Default configuration values
pub mod defaults {
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 8096;
    pub const DATABASE_PATH: &str = "data/stats.db";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const SHORT_TIME_PERIOD_MINUTES: u32 = 15;
    pub const LOG_LEVEL: &str = "FINE";
    pub const LOG_PAGE_SIZE: u32 = 10_000;
    pub const DAYS_STATS_TO_KEEP: u32 = 30;
    pub const JOB_HISTORY_DAYS: u32 = 90;
    pub const PORTAL_TOKEN_EXPIRATION_MINUTES: u32 = 60;
    pub const RECENT_RUNS_LIMIT: i64 = 50;
}
