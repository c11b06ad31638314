// File: manager/src/services/cleanup_service.rs
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::database::Database;
use crate::gis::GisClient;
use crate::stats::STAT_DATE_FIELD;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableCleanup {
    pub table: String,
    pub matched: u64,
    pub deleted: usize,
    pub failed: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CleanupReport {
    pub days_to_keep: u32,
    pub tables: Vec<TableCleanup>,
    pub rows_deleted: usize,
    pub job_runs_pruned: u64,
}

impl CleanupReport {
    pub fn failed_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.error.is_some())
            .map(|t| t.table.as_str())
            .collect()
    }
}

#[derive(Clone)]
pub struct CleanupService {
    config: Arc<Config>,
    client: GisClient,
    database: Arc<Database>,
}

impl CleanupService {
    pub fn new(config: Arc<Config>, client: GisClient, database: Arc<Database>) -> Self {
        Self {
            config,
            client,
            database,
        }
    }

    /// Every table URL of every server, deduplicated and sorted
    pub fn tables(&self) -> Vec<String> {
        let tables: BTreeSet<String> = self
            .config
            .servers
            .values()
            .flat_map(|server| server.tables.all())
            .map(|(_, url)| url.trim_end_matches('/').to_string())
            .collect();
        tables.into_iter().collect()
    }

    /// Delete stat rows older than the retention window, then prune old
    /// job history. A failing table does not stop the others, but fails the
    /// run once all tables were tried.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<CleanupReport> {
        let days = self.config.retention.days_to_keep;
        let where_clause = stale_rows_where(days);
        let tables = self.tables();

        let mut report = CleanupReport {
            days_to_keep: days,
            ..Default::default()
        };

        if tables.is_empty() {
            info!("No stat tables configured, nothing to clean up");
        } else {
            info!(
                "Cleaning up {} tables, keeping {} days of stats",
                tables.len(),
                days
            );
            let token = self.client.generate_portal_token(&self.config.portal).await?;

            for table in tables {
                let outcome = self.clean_table(&table, &token, &where_clause).await;
                report.rows_deleted += outcome.deleted;
                report.tables.push(outcome);
            }
        }

        match self
            .database
            .delete_job_runs_older_than(self.config.retention.job_history_days)
            .await
        {
            Ok(count) => report.job_runs_pruned = count,
            Err(e) => warn!("Failed to prune job history: {}", e),
        }

        let failed = report.failed_tables();
        if !failed.is_empty() {
            return Err(anyhow!(
                "Clean up failed for {} of {} tables: {}",
                failed.len(),
                report.tables.len(),
                failed.join(", ")
            ));
        }

        info!(
            "Clean up deleted {} rows across {} tables",
            report.rows_deleted,
            report.tables.len()
        );
        Ok(report)
    }

    async fn clean_table(&self, table: &str, token: &str, where_clause: &str) -> TableCleanup {
        let mut outcome = TableCleanup {
            table: table.to_string(),
            matched: 0,
            deleted: 0,
            failed: 0,
            error: None,
        };

        let matched = match self.client.count_features(table, token, where_clause).await {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to count stale rows in {}: {}", table, e);
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.matched = matched;

        if matched == 0 {
            info!("{}: nothing older than the retention window", table);
            return outcome;
        }

        match self.client.delete_features(table, token, where_clause).await {
            Ok(summary) => {
                outcome.deleted = summary.succeeded;
                outcome.failed = summary.failed;
                info!(
                    "{}: deleted {} of {} stale rows",
                    table, summary.succeeded, matched
                );
                // stale rows left behind fail the table
                if summary.failed > 0 {
                    error!("{}: {} stale rows could not be deleted", table, summary.failed);
                    outcome.error = Some(format!("{} rows could not be deleted", summary.failed));
                }
            }
            Err(e) => {
                error!("Failed to delete stale rows in {}: {}", table, e);
                outcome.error = Some(e.to_string());
            }
        }

        outcome
    }
}

/// Where clause matching rows older than `days` days
pub fn stale_rows_where(days: u32) -> String {
    format!("{} < CURRENT_TIMESTAMP - {}", STAT_DATE_FIELD, days)
}
