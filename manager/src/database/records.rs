//! Database record types (entities).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Values stored in `job_runs.status`
pub mod run_status {
    pub const STARTED: &str = "started";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

/// One execution of a job against a target (a server name, or `all`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: String,
    pub job: String,
    pub target: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// JSON-encoded job report
    pub details: Option<String>,
}
