//! In-memory tracking of job runs in progress
//!
//! Scheduled firings, manual API triggers and CLI runs all go through the
//! same tracker, so a job never runs twice at once against the same target.
//! A firing that finds its target busy is skipped.
//!
//! ```ignore
//! tracker.try_start("usage_stats:intgis", "usage_stats").await?;
//! // run the job...
//! tracker.finish("usage_stats:intgis").await;
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::errors::JobError;

#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub job: String,
    pub target_key: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunTrackerStatus {
    pub active_runs: HashMap<String, ActiveRun>,
    pub total_active: usize,
}

#[derive(Clone, Default)]
pub struct RunTracker {
    active_runs: Arc<RwLock<HashMap<String, ActiveRun>>>, // target_key -> run
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a target key; fails with [`JobError::Busy`] when already claimed
    #[instrument(skip(self))]
    pub async fn try_start(&self, target_key: &str, job: &str) -> Result<(), JobError> {
        let mut active = self.active_runs.write().await;

        if let Some(current) = active.get(target_key) {
            return Err(JobError::Busy {
                target: target_key.to_string(),
                running_for: format_elapsed(current.started_at),
            });
        }

        active.insert(
            target_key.to_string(),
            ActiveRun {
                job: job.to_string(),
                target_key: target_key.to_string(),
                started_at: Utc::now(),
            },
        );
        debug!("Claimed {} for {}", target_key, job);
        Ok(())
    }

    pub async fn finish(&self, target_key: &str) {
        let mut active = self.active_runs.write().await;
        if let Some(run) = active.remove(target_key) {
            debug!(
                "Released {} after {}",
                target_key,
                format_elapsed(run.started_at)
            );
        }
    }

    pub async fn is_busy(&self, target_key: &str) -> bool {
        self.active_runs.read().await.contains_key(target_key)
    }

    pub async fn status(&self) -> RunTrackerStatus {
        let active = self.active_runs.read().await;
        RunTrackerStatus {
            active_runs: active.clone(),
            total_active: active.len(),
        }
    }

    /// Drop claims older than `max_hours` (runs that never released them)
    pub async fn cleanup_stale(&self, max_hours: i64) -> u32 {
        let mut active = self.active_runs.write().await;
        let cutoff = Utc::now() - chrono::Duration::hours(max_hours);
        let initial_count = active.len();

        active.retain(|target_key, run| {
            let keep = run.started_at > cutoff;
            if !keep {
                warn!(
                    "Dropping stale run '{}' on {} (started {} ago)",
                    run.job,
                    target_key,
                    format_elapsed(run.started_at)
                );
            }
            keep
        });

        (initial_count - active.len()) as u32
    }
}

fn format_elapsed(started_at: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(started_at);
    if duration.num_hours() > 0 {
        format!("{}h {}m", duration.num_hours(), duration.num_minutes() % 60)
    } else if duration.num_minutes() > 0 {
        format!("{}m", duration.num_minutes())
    } else {
        format!("{}s", duration.num_seconds())
    }
}
