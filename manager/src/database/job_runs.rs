//! Job run history operations.

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error};

use super::records::{run_status, JobRun};
use super::Database;

impl Database {
    pub async fn store_job_run(&self, run: &JobRun) -> Result<()> {
        debug!("Storing job run: {} ({})", run.id, run.status);

        match sqlx::query(
            r#"
            INSERT OR REPLACE INTO job_runs (
                id, job, target, status, started_at,
                completed_at, error_message, details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.id)
        .bind(&run.job)
        .bind(&run.target)
        .bind(&run.status)
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(&run.error_message)
        .bind(&run.details)
        .execute(&self.pool)
        .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to store job run {}: {}", run.id, e);
                Err(e.into())
            }
        }
    }

    pub async fn get_job_run(&self, run_id: &str) -> Result<Option<JobRun>> {
        let row = sqlx::query(
            r#"
            SELECT id, job, target, status, started_at,
                   completed_at, error_message, details
            FROM job_runs
            WHERE id = ?
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| job_run_from_row(&row)).transpose()
    }

    /// Most recent runs first, optionally restricted to one job
    pub async fn recent_job_runs(&self, limit: i64, job: Option<&str>) -> Result<Vec<JobRun>> {
        let rows = match job {
            Some(job) => {
                sqlx::query(
                    r#"
                    SELECT id, job, target, status, started_at,
                           completed_at, error_message, details
                    FROM job_runs
                    WHERE job = ?
                    ORDER BY started_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(job)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, job, target, status, started_at,
                           completed_at, error_message, details
                    FROM job_runs
                    ORDER BY started_at DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(job_run_from_row).collect()
    }

    pub async fn delete_job_runs_older_than(&self, days: u32) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));

        let result = sqlx::query("DELETE FROM job_runs WHERE started_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        debug!(
            "Deleted {} job runs older than {} days",
            result.rows_affected(),
            days
        );
        Ok(result.rows_affected())
    }

    /// Runs still marked as started belong to a process that died mid-run
    pub(super) async fn fail_interrupted_job_runs(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE job_runs
            SET status = ?, completed_at = ?, error_message = ?
            WHERE status = ?
            "#,
        )
        .bind(run_status::FAILED)
        .bind(Utc::now())
        .bind("Interrupted by manager restart")
        .bind(run_status::STARTED)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn job_run_from_row(row: &SqliteRow) -> Result<JobRun> {
    Ok(JobRun {
        id: row.try_get("id")?,
        job: row.try_get("job")?,
        target: row.try_get("target")?,
        status: row.try_get("status")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        error_message: row.try_get("error_message")?,
        details: row.try_get("details")?,
    })
}
