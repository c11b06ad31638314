// File: manager/src/scheduler/operations.rs
use crate::config::Config;
use crate::errors::{JobError, ManagerError};
use crate::services::job_runner::{Job as StatsJob, JobRunner};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, instrument, warn};

pub struct StatsScheduler {
    config: Arc<Config>,
    job_runner: Arc<JobRunner>,
    scheduler: JobScheduler,
}

impl StatsScheduler {
    pub async fn new(config: Arc<Config>, job_runner: Arc<JobRunner>) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create JobScheduler: {}", e))?;

        Ok(Self {
            config,
            job_runner,
            scheduler,
        })
    }

    /// Register every configured schedule and start the scheduler.
    /// Returns the number of jobs scheduled.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<usize> {
        info!("Starting stats scheduler with 6-field cron format (sec min hour day month dow)");
        let mut scheduled_count = 0;

        for job in StatsJob::ALL {
            let Some(schedule) = self.schedule_for(job) else {
                info!("No schedule configured for {}", job);
                continue;
            };

            for target in self.job_runner.default_targets(job) {
                let server = job.is_per_server().then(|| target.clone());
                match self.schedule_job(job, server, schedule.to_string()).await {
                    Ok(_) => {
                        scheduled_count += 1;
                        info!("Scheduled {} for {}: {}", job, target, schedule);
                    }
                    Err(e) => {
                        error!(
                            "Failed to schedule {} for {}: {} (schedule: {})",
                            job, target, e, schedule
                        );
                    }
                }
            }
        }

        if scheduled_count > 0 {
            self.scheduler
                .start()
                .await
                .map_err(|e| anyhow!("Failed to start scheduler: {}", e))?;
            info!("Stats scheduler started with {} jobs", scheduled_count);
        } else {
            warn!("No scheduled jobs configured - scheduler not started");
        }

        Ok(scheduled_count)
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow!("Failed to stop scheduler: {}", e))
    }

    fn schedule_for(&self, job: StatsJob) -> Option<&str> {
        let schedules = &self.config.schedules;
        match job {
            StatsJob::UsageStats => schedules.usage_stats.as_deref(),
            StatsJob::ServiceStatus => schedules.service_status.as_deref(),
            StatsJob::CleanUp => schedules.clean_up.as_deref(),
        }
    }

    async fn schedule_job(
        &self,
        job: StatsJob,
        server: Option<String>,
        schedule: String,
    ) -> Result<()> {
        validate_6_field_cron(&schedule)
            .map_err(|e| anyhow!("Invalid 6-field cron schedule '{}': {}", schedule, e))?;

        let job_runner = self.job_runner.clone();

        let cron_job = Job::new_async(schedule.as_str(), move |_uuid, _scheduler| {
            let job_runner = job_runner.clone();
            let server = server.clone();

            Box::pin(async move {
                let target = server.as_deref().unwrap_or("all");
                info!("Executing scheduled {} for {}", job, target);

                match job_runner.run(job, server.as_deref()).await {
                    Ok(report) => {
                        info!(
                            "Scheduled {} for {} finished (run_id: {})",
                            job, target, report.run_id
                        );
                    }
                    Err(ManagerError::Job(JobError::Busy {
                        target,
                        running_for,
                    })) => {
                        warn!(
                            "Skipping scheduled {}: {} still running after {}",
                            job, target, running_for
                        );
                    }
                    Err(e) => {
                        error!("Scheduled {} for {} failed: {}", job, target, e);
                    }
                }
            })
        })
        .map_err(|e| anyhow!("Failed to create {} job for '{}': {}", job, schedule, e))?;

        self.scheduler
            .add(cron_job)
            .await
            .map_err(|e| anyhow!("Failed to add {} job to scheduler: {}", job, e))?;

        Ok(())
    }
}

/// tokio-cron-scheduler only accepts the 6-field form, so reject anything
/// else up front with a readable message
pub fn validate_6_field_cron(schedule: &str) -> Result<()> {
    let parts: Vec<&str> = schedule.split_whitespace().collect();

    if parts.len() != 6 {
        return Err(anyhow!(
            "expected 6 fields (second minute hour day month dayofweek), got {}: '{}'",
            parts.len(),
            schedule
        ));
    }

    validate_cron_field(parts[0], "second", 0, 59)?;
    validate_cron_field(parts[1], "minute", 0, 59)?;
    validate_cron_field(parts[2], "hour", 0, 23)?;
    validate_cron_field(parts[3], "day", 1, 31)?;
    validate_cron_field(parts[4], "month", 1, 12)?;
    validate_cron_field(parts[5], "dayofweek", 0, 7)?;

    Ok(())
}

fn validate_cron_field(field: &str, name: &str, min: u32, max: u32) -> Result<()> {
    if field == "*" || field == "?" {
        return Ok(());
    }

    if field.contains(',') {
        for part in field.split(',') {
            validate_cron_field(part, name, min, max)?;
        }
        return Ok(());
    }

    if let Some((base, step)) = field.split_once('/') {
        let step = step
            .parse::<u32>()
            .map_err(|_| anyhow!("Invalid {} step value: {}", name, step))?;
        if step == 0 {
            return Err(anyhow!("{} step value cannot be 0", name));
        }
        return validate_cron_field(base, name, min, max);
    }

    if let Some((start, end)) = field.split_once('-') {
        let start = parse_in_range(start, name, min, max)?;
        let end = parse_in_range(end, name, min, max)?;
        if start > end {
            return Err(anyhow!("{} range {}-{} is reversed", name, start, end));
        }
        return Ok(());
    }

    parse_in_range(field, name, min, max).map(|_| ())
}

fn parse_in_range(value: &str, name: &str, min: u32, max: u32) -> Result<u32> {
    let parsed = value
        .parse::<u32>()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, value))?;

    if parsed < min || parsed > max {
        return Err(anyhow!(
            "{} value {} is outside valid range {}-{}",
            name,
            parsed,
            min,
            max
        ));
    }

    Ok(parsed)
}
