// File: manager/src/services/usage_stats_service.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, ServerConfig};
use crate::constants::logs;
use crate::errors::{ConfigError, JobError};
use crate::gis::{GisClient, LogMessage};
use crate::stats::{aggregate, StatWindow};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UsageStatsReport {
    pub server: String,
    pub stat_date: String,
    pub window_start: i64,
    pub window_end: i64,
    pub log_pages: usize,
    pub log_messages: usize,
    pub services_requested: u64,
    pub layers_drawn: u64,
    pub avg_layer_draw_time: f64,
    pub errors: usize,
    pub warnings: usize,
    pub rows_posted: usize,
    pub rows_failed: usize,
    /// Row kinds produced but not written because no table is configured
    pub skipped_tables: Vec<String>,
}

#[derive(Clone)]
pub struct UsageStatsService {
    config: Arc<Config>,
    client: GisClient,
}

impl UsageStatsService {
    pub fn new(config: Arc<Config>, client: GisClient) -> Self {
        Self { config, client }
    }

    pub async fn run(&self, server_name: &str) -> Result<UsageStatsReport> {
        self.run_at(server_name, Utc::now()).await
    }

    /// Collect and post the stats for the period ending at `now`
    #[instrument(skip(self))]
    pub async fn run_at(&self, server_name: &str, now: DateTime<Utc>) -> Result<UsageStatsReport> {
        let server = self
            .config
            .server(server_name)
            .ok_or_else(|| JobError::UnknownServer {
                server: server_name.to_string(),
            })?;

        let period_table = server.tables.stats_per_time_period.as_deref().ok_or_else(|| {
            ConfigError::MissingRequired {
                field: format!("{}.tables.stats_per_time_period", server.name),
            }
        })?;

        let window = StatWindow::ending_at(now, server.short_time_period_minutes);
        let stat_date = window.stat_date_label();
        info!(
            "Collecting usage stats for {} ({} minutes ending {})",
            server.name, server.short_time_period_minutes, stat_date
        );

        let server_token = self.client.generate_server_token(server).await?;
        let (messages, log_pages) = self.collect_logs(server, &server_token, &window).await?;
        let log_messages = messages.len();

        let stats = aggregate(messages, &stat_date, &server.excluded_services);
        info!(
            "{}: {} services requested, {} layers drawn, {} errors, {} warnings",
            server.name,
            stats.services_requested,
            stats.layers_drawn,
            stats.errors.len(),
            stats.warnings.len()
        );

        let mut report = UsageStatsReport {
            server: server.name.clone(),
            stat_date: stat_date.clone(),
            window_start: window.start_time,
            window_end: window.end_time,
            log_pages,
            log_messages,
            services_requested: stats.services_requested,
            layers_drawn: stats.layers_drawn,
            avg_layer_draw_time: stats.avg_draw_time(),
            errors: stats.errors.len(),
            warnings: stats.warnings.len(),
            ..Default::default()
        };

        let portal_token = self.client.generate_portal_token(&self.config.portal).await?;
        let tables = &server.tables;

        self.post_rows(
            "stats_per_time_period",
            Some(period_table),
            &portal_token,
            &[stats.period_row()],
            &mut report,
        )
        .await?;
        self.post_rows(
            "errors",
            tables.errors.as_deref(),
            &portal_token,
            &stats.error_rows(),
            &mut report,
        )
        .await?;
        self.post_rows(
            "warnings",
            tables.warnings.as_deref(),
            &portal_token,
            &stats.warning_rows(),
            &mut report,
        )
        .await?;
        self.post_rows(
            "services_requested",
            tables.services_requested.as_deref(),
            &portal_token,
            &stats.service_count_rows(),
            &mut report,
        )
        .await?;
        self.post_rows(
            "layers_drawn",
            tables.layers_drawn.as_deref(),
            &portal_token,
            &stats.layer_count_rows(),
            &mut report,
        )
        .await?;
        self.post_rows(
            "avg_layer_draw_time",
            tables.avg_layer_draw_time.as_deref(),
            &portal_token,
            &stats.layer_draw_time_rows(),
            &mut report,
        )
        .await?;

        info!(
            "Posted {} stat rows for {} at {} ({} failed)",
            report.rows_posted, server.name, stat_date, report.rows_failed
        );
        Ok(report)
    }

    /// Page backwards through the window, newest batch first.
    ///
    /// Each follow-up request starts one millisecond before the oldest
    /// message of the previous batch. Returns the messages and the number of
    /// batches fetched.
    async fn collect_logs(
        &self,
        server: &ServerConfig,
        token: &str,
        window: &StatWindow,
    ) -> Result<(Vec<LogMessage>, usize)> {
        let mut messages: Vec<LogMessage> = Vec::new();
        let mut start_time = window.start_time;
        let mut pages = 0;

        loop {
            if pages >= logs::MAX_LOG_PAGES {
                warn!(
                    "Stopped paging logs for {} after {} batches ({} messages)",
                    server.name,
                    pages,
                    messages.len()
                );
                break;
            }

            let page = self
                .client
                .query_logs(server, token, start_time, window.end_time)
                .await?;
            pages += 1;

            let oldest = page.log_messages.iter().map(|m| m.time).min();
            debug!(
                "Log batch {} for {}: {} messages, has_more={}",
                pages,
                server.name,
                page.log_messages.len(),
                page.has_more
            );
            messages.extend(page.log_messages);

            if !page.has_more {
                break;
            }

            let Some(oldest) = oldest else {
                break;
            };

            let next_start = oldest - 1;
            if next_start >= start_time || next_start < window.end_time {
                debug!("Log cursor for {} stopped moving at {}", server.name, oldest);
                break;
            }
            start_time = next_start;
        }

        Ok((messages, pages))
    }

    async fn post_rows<T: Serialize>(
        &self,
        table_name: &str,
        table_url: Option<&str>,
        token: &str,
        rows: &[T],
        report: &mut UsageStatsReport,
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let Some(table_url) = table_url else {
            info!(
                "No {} table configured for {}, skipping {} rows",
                table_name,
                report.server,
                rows.len()
            );
            report.skipped_tables.push(table_name.to_string());
            return Ok(());
        };

        let summary = self.client.add_features(table_url, token, rows).await?;
        if summary.failed > 0 {
            warn!(
                "{} of {} {} rows were rejected for {}",
                summary.failed,
                rows.len(),
                table_name,
                report.server
            );
        }
        report.rows_posted += summary.succeeded;
        report.rows_failed += summary.failed;
        Ok(())
    }
}
