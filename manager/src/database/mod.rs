//! Database layer for the stats manager.
//!
//! SQLite persistence for the job run history, so scheduled and manual runs
//! can be audited through the API after the fact.
//!
//! - `records` - record types
//! - `job_runs` - job run operations

mod job_runs;
mod records;

pub use records::*;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info, warn};

pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Expose pool for integration test queries
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        info!("Opening job history database at {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!("Failed to create database directory {:?}: {}", parent, e);
                    return Err(e.into());
                }
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let options = SqliteConnectOptions::from_str(&database_url)?;
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Self::with_pool(pool).await
    }

    /// In-memory database, used by tests and `run` mode without persistence
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> Result<Self> {
        let database = Self { pool };
        database.initialize_tables().await?;

        match database.fail_interrupted_job_runs().await {
            Ok(0) => {}
            Ok(count) => warn!("Marked {} interrupted job runs as failed", count),
            Err(e) => warn!("Failed to clean up interrupted job runs: {}", e),
        }

        Ok(database)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let job_runs_sql = r#"
            CREATE TABLE IF NOT EXISTS job_runs (
                id TEXT PRIMARY KEY,
                job TEXT NOT NULL,
                target TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at DATETIME NOT NULL,
                completed_at DATETIME,
                error_message TEXT,
                details TEXT
            )
        "#;

        if let Err(e) = sqlx::query(job_runs_sql).execute(&self.pool).await {
            error!("Failed to create job_runs table: {}", e);
            return Err(e.into());
        }

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_job_runs_job_started ON job_runs(job, started_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_job_runs_started ON job_runs(started_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        info!("job_runs table ready");
        Ok(())
    }
}
