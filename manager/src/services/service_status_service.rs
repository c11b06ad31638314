// File: manager/src/services/service_status_service.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{Config, ServerConfig};
use crate::constants::service_state;
use crate::errors::JobError;
use crate::gis::{GisClient, ServiceStatus};
use crate::services::alert_service::AlertService;
use crate::stats::rows::{ServiceDownRow, ServiceStatusRow};
use crate::stats::{Feature, StatWindow};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ServiceStatusReport {
    pub server: String,
    pub stat_date: String,
    pub services_up: u64,
    pub services_down: u64,
    pub total_services: u64,
    pub down_services: Vec<String>,
    pub rows_posted: usize,
    pub rows_failed: usize,
}

/// How a service's state counts towards the status row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceHealth {
    Up,
    Down,
    /// Configured as stopped; only counted in the total
    Stopped,
}

impl ServiceHealth {
    pub fn from_status(status: &ServiceStatus) -> Self {
        if status.configured_state != service_state::STARTED {
            ServiceHealth::Stopped
        } else if status.real_time_state == service_state::STARTED {
            ServiceHealth::Up
        } else {
            ServiceHealth::Down
        }
    }
}

#[derive(Clone)]
pub struct ServiceStatusService {
    config: Arc<Config>,
    client: GisClient,
    alert_service: Arc<AlertService>,
}

impl ServiceStatusService {
    pub fn new(config: Arc<Config>, client: GisClient, alert_service: Arc<AlertService>) -> Self {
        Self {
            config,
            client,
            alert_service,
        }
    }

    pub async fn run(&self, server_name: &str) -> Result<ServiceStatusReport> {
        self.run_at(server_name, Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn run_at(
        &self,
        server_name: &str,
        now: DateTime<Utc>,
    ) -> Result<ServiceStatusReport> {
        let server = self
            .config
            .server(server_name)
            .ok_or_else(|| JobError::UnknownServer {
                server: server_name.to_string(),
            })?;

        let stat_date = StatWindow::ending_at(now, server.short_time_period_minutes)
            .stat_date_label();
        info!("Checking service status on {}", server.name);

        let token = self.client.generate_server_token(server).await?;
        let mut report = self.check_services(server, &token).await?;
        report.stat_date = stat_date;

        info!(
            "{}: {} up, {} down, {} total",
            server.name, report.services_up, report.services_down, report.total_services
        );
        if !report.down_services.is_empty() {
            warn!(
                "Services down on {}: {}",
                server.name,
                report.down_services.join(", ")
            );
        }

        if let Err(e) = self
            .alert_service
            .report_services_down(&server.name, &report.down_services)
            .await
        {
            error!("Failed to report down services for {}: {}", server.name, e);
        }

        self.post_rows(server, &mut report).await?;
        Ok(report)
    }

    async fn check_services(
        &self,
        server: &ServerConfig,
        token: &str,
    ) -> Result<ServiceStatusReport> {
        let mut report = ServiceStatusReport {
            server: server.name.clone(),
            ..Default::default()
        };

        for folder in self.client.list_folders(server, token).await? {
            let services = self.client.list_services(server, token, &folder).await?;
            debug!(
                "Folder '{}' on {} has {} services",
                folder,
                server.name,
                services.len()
            );

            // Status lookups within a folder run concurrently; results keep listing order
            let lookups = services
                .iter()
                .map(|service| self.client.service_status(server, token, &folder, service));
            let statuses = join_all(lookups).await;

            for (service, status) in services.iter().zip(statuses) {
                let status = status?;

                report.total_services += 1;
                match ServiceHealth::from_status(&status) {
                    ServiceHealth::Up => report.services_up += 1,
                    ServiceHealth::Down => {
                        report.services_down += 1;
                        report
                            .down_services
                            .push(display_name(&folder, &service.qualified_name()));
                    }
                    ServiceHealth::Stopped => {}
                }
            }
        }

        Ok(report)
    }

    async fn post_rows(&self, server: &ServerConfig, report: &mut ServiceStatusReport) -> Result<()> {
        let status_table = server.tables.services_status.as_deref();
        let down_table = server
            .tables
            .services_down
            .as_deref()
            .filter(|_| !report.down_services.is_empty());

        if status_table.is_none() && down_table.is_none() {
            info!(
                "No service status tables configured for {}, nothing to post",
                server.name
            );
            return Ok(());
        }

        let token = self.client.generate_portal_token(&self.config.portal).await?;

        if let Some(table) = status_table {
            let row = Feature::new(ServiceStatusRow {
                stat_date: report.stat_date.clone(),
                services_up: report.services_up,
                services_down: report.services_down,
                total_services: report.total_services,
            });
            let summary = self.client.add_features(table, &token, &[row]).await?;
            report.rows_posted += summary.succeeded;
            report.rows_failed += summary.failed;
        }

        if let Some(table) = down_table {
            let rows: Vec<Feature<ServiceDownRow>> = report
                .down_services
                .iter()
                .map(|service| {
                    Feature::new(ServiceDownRow {
                        stat_date: report.stat_date.clone(),
                        service: service.clone(),
                    })
                })
                .collect();
            let summary = self.client.add_features(table, &token, &rows).await?;
            report.rows_posted += summary.succeeded;
            report.rows_failed += summary.failed;
        }

        if report.rows_failed > 0 {
            warn!(
                "{} service status rows were rejected for {}",
                report.rows_failed, server.name
            );
        }
        Ok(())
    }
}

/// `folder/name.Type`, or `name.Type` for the root folder
fn display_name(folder: &str, qualified_name: &str) -> String {
    if folder.is_empty() {
        qualified_name.to_string()
    } else {
        format!("{}/{}", folder, qualified_name)
    }
}
