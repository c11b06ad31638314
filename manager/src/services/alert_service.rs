// File: manager/src/services/alert_service.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::constants::alerts;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AlertType {
    JobFailure,
    ServicesDown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AlertSeverity {
    Critical,
    Warning,
    Recovery,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub timestamp: DateTime<Utc>,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub target: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
struct OutageState {
    down_services: BTreeSet<String>,
    first_seen: DateTime<Utc>,
    alert_sent: bool,
}

#[derive(Clone)]
pub struct AlertService {
    webhook_url: String,
    client: Client,
    outages: Arc<Mutex<HashMap<String, OutageState>>>,
}

impl AlertService {
    pub fn new(webhook_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(alerts::WEBHOOK_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for AlertService: {}", e))?;

        Ok(Self {
            webhook_url,
            client,
            outages: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.webhook_url.is_empty()
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// Immediate alert for a job run that failed
    pub async fn send_job_failure(&self, job: &str, target: &str, error: &str) -> Result<()> {
        let payload = AlertPayload {
            timestamp: Utc::now(),
            alert_type: AlertType::JobFailure,
            severity: AlertSeverity::Critical,
            target: target.to_string(),
            message: format!("{} failed for {}: {}", job, target, error),
            details: Some(serde_json::json!({
                "job": job,
                "error": error,
            })),
        };

        self.send_webhook(&payload).await
    }

    /// Report the services currently down on a server.
    ///
    /// Alerts when an outage starts or spreads to more services; sends a
    /// recovery once everything is back after an alert went out. A down set
    /// that is unchanged or shrinking does not alert again.
    pub async fn report_services_down(&self, server: &str, down_services: &[String]) -> Result<()> {
        let current: BTreeSet<String> = down_services.iter().cloned().collect();
        let now = Utc::now();

        let payload = {
            let mut outages = self.outages.lock().await;

            if current.is_empty() {
                match outages.remove(server) {
                    Some(state) if state.alert_sent => Some(AlertPayload {
                        timestamp: now,
                        alert_type: AlertType::ServicesDown,
                        severity: AlertSeverity::Recovery,
                        target: server.to_string(),
                        message: format!("All services on {} are running again", server),
                        details: Some(serde_json::json!({
                            "recovered": state.down_services,
                            "down_since": state.first_seen,
                        })),
                    }),
                    _ => None,
                }
            } else {
                let newly_down: Vec<String> = match outages.get(server) {
                    Some(state) => current
                        .difference(&state.down_services)
                        .cloned()
                        .collect(),
                    None => current.iter().cloned().collect(),
                };

                let state = outages.entry(server.to_string()).or_insert(OutageState {
                    down_services: BTreeSet::new(),
                    first_seen: now,
                    alert_sent: false,
                });
                state.down_services = current.clone();

                if newly_down.is_empty() {
                    debug!(
                        "{} services still down on {}, no new outages",
                        current.len(),
                        server
                    );
                    None
                } else {
                    state.alert_sent = true;
                    Some(AlertPayload {
                        timestamp: now,
                        alert_type: AlertType::ServicesDown,
                        severity: AlertSeverity::Critical,
                        target: server.to_string(),
                        message: format!(
                            "{} service(s) down on {}: {}",
                            current.len(),
                            server,
                            current.iter().cloned().collect::<Vec<_>>().join(", ")
                        ),
                        details: Some(serde_json::json!({
                            "down": current,
                            "newly_down": newly_down,
                        })),
                    })
                }
            }
        };

        match payload {
            Some(payload) => self.send_webhook(&payload).await,
            None => Ok(()),
        }
    }

    /// Servers with an outage currently tracked
    pub async fn servers_with_outages(&self) -> Vec<String> {
        let outages = self.outages.lock().await;
        let mut servers: Vec<String> = outages.keys().cloned().collect();
        servers.sort();
        servers
    }

    async fn send_webhook(&self, payload: &AlertPayload) -> Result<()> {
        if self.webhook_url.is_empty() {
            debug!("No webhook URL configured, skipping alert");
            return Ok(());
        }

        match timeout(
            Duration::from_secs(alerts::WEBHOOK_TIMEOUT_SECONDS),
            self.client.post(&self.webhook_url).json(payload).send(),
        )
        .await
        {
            Ok(Ok(response)) => {
                if response.status().is_success() {
                    info!(
                        "Alert sent for {}: {:?} ({:?})",
                        payload.target, payload.alert_type, payload.severity
                    );
                } else {
                    warn!(
                        "Alert webhook returned status: {} for {}",
                        response.status(),
                        payload.target
                    );
                }
            }
            Ok(Err(e)) => {
                warn!("Failed to send alert for {}: {}", payload.target, e);
            }
            Err(_) => {
                warn!("Alert webhook timeout for {}", payload.target);
            }
        }

        Ok(())
    }
}
