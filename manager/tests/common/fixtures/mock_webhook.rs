//! Mock webhook server for testing alert delivery
//!
//! This simulates a webhook endpoint that receives alerts,
//! allowing tests to verify alerts are sent correctly.

use serde_json::Value;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Mock webhook server that records alert requests
pub struct MockWebhookServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockWebhookServer {
    /// Create a new mock webhook server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// Mock successful webhook delivery
    pub async fn mock_success(&self) {
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    /// Mock webhook failure
    pub async fn mock_failure(&self, status_code: u16) {
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .respond_with(ResponseTemplate::new(status_code))
            .mount(&self.server)
            .await;
    }

    /// Get the webhook URL
    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.base_url)
    }

    /// Bodies of every alert received so far
    pub async fn alerts(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path() == "/webhook")
            .filter_map(|req| req.body_json::<Value>().ok())
            .collect()
    }

    pub async fn alert_count(&self) -> usize {
        self.alerts().await.len()
    }

    /// Alerts with the given severity (`Critical`, `Warning`, `Recovery`)
    pub async fn alerts_with_severity(&self, severity: &str) -> Vec<Value> {
        self.alerts()
            .await
            .into_iter()
            .filter(|alert| alert.get("severity").and_then(Value::as_str) == Some(severity))
            .collect()
    }
}
