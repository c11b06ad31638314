// File: manager/src/services/job_runner.rs
//
// Common wrapper for every job run: target resolution, mutual exclusion,
// job history records and failure alerts
//
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::{run_status, Database, JobRun};
use crate::errors::{JobError, ManagerError};
use crate::gis::GisClient;
use crate::run_tracker::RunTracker;
use crate::services::alert_service::AlertService;
use crate::services::cleanup_service::{CleanupReport, CleanupService};
use crate::services::service_status_service::{ServiceStatusReport, ServiceStatusService};
use crate::services::usage_stats_service::{UsageStatsReport, UsageStatsService};

/// Target recorded for jobs that are not tied to one server
pub const ALL_TARGETS: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    UsageStats,
    ServiceStatus,
    CleanUp,
}

impl Job {
    pub const ALL: [Job; 3] = [Job::UsageStats, Job::ServiceStatus, Job::CleanUp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Job::UsageStats => "usage_stats",
            Job::ServiceStatus => "service_status",
            Job::CleanUp => "clean_up",
        }
    }

    /// Usage stats and service status run once per server
    pub fn is_per_server(&self) -> bool {
        !matches!(self, Job::CleanUp)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Job {
    type Err = JobError;

    /// Accepts `usage_stats` as well as the CLI spelling `usage-stats`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "usage_stats" => Ok(Job::UsageStats),
            "service_status" => Ok(Job::ServiceStatus),
            "clean_up" | "cleanup" => Ok(Job::CleanUp),
            _ => Err(JobError::UnknownJob { job: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobSummary {
    UsageStats(UsageStatsReport),
    ServiceStatus(ServiceStatusReport),
    CleanUp(CleanupReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub run_id: String,
    pub job: Job,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub summary: JobSummary,
}

#[derive(Clone)]
pub struct JobRunner {
    config: Arc<Config>,
    database: Arc<Database>,
    alert_service: Arc<AlertService>,
    run_tracker: RunTracker,
    usage_stats: UsageStatsService,
    service_status: ServiceStatusService,
    cleanup: CleanupService,
}

impl JobRunner {
    pub fn new(
        config: Arc<Config>,
        database: Arc<Database>,
        alert_service: Arc<AlertService>,
        run_tracker: RunTracker,
    ) -> Result<Self> {
        let client = GisClient::new(config.request_timeout_seconds)?;

        Ok(Self {
            usage_stats: UsageStatsService::new(config.clone(), client.clone()),
            service_status: ServiceStatusService::new(
                config.clone(),
                client.clone(),
                alert_service.clone(),
            ),
            cleanup: CleanupService::new(config.clone(), client, database.clone()),
            config,
            database,
            alert_service,
            run_tracker,
        })
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    pub fn run_tracker(&self) -> &RunTracker {
        &self.run_tracker
    }

    /// Targets a job runs against when none is named: every server with the
    /// job enabled, or the single global target for clean up
    pub fn default_targets(&self, job: Job) -> Vec<String> {
        match job {
            Job::UsageStats => self
                .config
                .server_names()
                .into_iter()
                .filter(|name| {
                    self.config
                        .server(name)
                        .is_some_and(|s| s.usage_stats_enabled)
                })
                .collect(),
            Job::ServiceStatus => self
                .config
                .server_names()
                .into_iter()
                .filter(|name| {
                    self.config
                        .server(name)
                        .is_some_and(|s| s.service_status_enabled)
                })
                .collect(),
            Job::CleanUp => vec![ALL_TARGETS.to_string()],
        }
    }

    /// Resolve the target a run is recorded against
    pub fn resolve_target(&self, job: Job, server: Option<&str>) -> Result<String, JobError> {
        if !job.is_per_server() {
            return Ok(ALL_TARGETS.to_string());
        }

        match server {
            Some(name) if self.config.server(name).is_some() => Ok(name.to_string()),
            Some(name) => Err(JobError::UnknownServer {
                server: name.to_string(),
            }),
            None => Err(JobError::MissingServer {
                job: job.to_string(),
            }),
        }
    }

    /// Run a job now and wait for it to finish.
    ///
    /// Refuses to start when the same job is already running for the target.
    /// The run itself is a spawned task: dropping the caller (a disconnected
    /// HTTP client) does not abandon the claim or the history record.
    pub async fn run(&self, job: Job, server: Option<&str>) -> Result<JobReport, ManagerError> {
        let target = self.resolve_target(job, server)?;
        let target_key = format!("{}:{}", job, target);

        self.run_tracker.try_start(&target_key, job.as_str()).await?;

        let runner = self.clone();
        let task_key = target_key.clone();
        let handle = tokio::spawn(async move {
            let result = runner.run_recorded(job, &target).await;
            runner.run_tracker.finish(&task_key).await;
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                // the task panicked before it could release the target
                error!("{} task for {} aborted: {}", job, target_key, e);
                self.run_tracker.finish(&target_key).await;
                Err(ManagerError::Other(format!("{} run aborted: {}", job, e)))
            }
        }
    }

    async fn run_recorded(&self, job: Job, target: &str) -> Result<JobReport, ManagerError> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!("Starting {} for {} (run_id: {})", job, target, run_id);

        let mut record = JobRun {
            id: run_id.clone(),
            job: job.to_string(),
            target: target.to_string(),
            status: run_status::STARTED.to_string(),
            started_at,
            completed_at: None,
            error_message: None,
            details: None,
        };

        if let Err(e) = self.database.store_job_run(&record).await {
            warn!("Failed to record start of run {}: {}", run_id, e);
        }

        let outcome = self.execute(job, target).await;
        let completed_at = Utc::now();
        record.completed_at = Some(completed_at);
        let elapsed = completed_at.signed_duration_since(started_at);

        let result = match outcome {
            Ok(summary) => {
                info!(
                    "{} for {} completed in {}.{:03}s (run_id: {})",
                    job,
                    target,
                    elapsed.num_seconds(),
                    elapsed.num_milliseconds() % 1000,
                    run_id
                );
                record.status = run_status::COMPLETED.to_string();
                record.details = serde_json::to_string(&summary).ok();

                Ok(JobReport {
                    run_id,
                    job,
                    target: target.to_string(),
                    started_at,
                    completed_at,
                    summary,
                })
            }
            Err(e) => {
                let message = format!("{:#}", e);
                error!("{} for {} failed (run_id: {}): {}", job, target, run_id, message);
                record.status = run_status::FAILED.to_string();
                record.error_message = Some(message.clone());

                if let Err(alert_error) = self
                    .alert_service
                    .send_job_failure(job.as_str(), target, &message)
                    .await
                {
                    error!("Failed to send failure alert: {}", alert_error);
                }

                Err(e.into())
            }
        };

        if let Err(e) = self.database.store_job_run(&record).await {
            warn!("Failed to record outcome of run {}: {}", record.id, e);
        }

        result
    }

    async fn execute(&self, job: Job, target: &str) -> Result<JobSummary> {
        match job {
            Job::UsageStats => self
                .usage_stats
                .run(target)
                .await
                .map(JobSummary::UsageStats),
            Job::ServiceStatus => self
                .service_status
                .run(target)
                .await
                .map(JobSummary::ServiceStatus),
            Job::CleanUp => self.cleanup.run().await.map(JobSummary::CleanUp),
        }
    }
}
