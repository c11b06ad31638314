//! Thin client for the GIS server admin API, the portal token endpoint and
//! feature-service edit operations.
//!
//! Every call is a form-encoded POST with `f=json`. Responses go through
//! [`check_json_success`] so that error documents returned with HTTP 200 are
//! surfaced as [`GisError`]s rather than as missing fields.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::types::{
    AddFeaturesResponse, CountResponse, DeleteFeaturesResponse, EditSummary, FolderListing,
    LogPage, ServiceEntry, ServiceListing, ServiceStatus, TokenResponse,
};
use crate::config::{PortalConfig, ServerConfig};
use crate::constants::{http, logs};
use crate::errors::GisError;

#[derive(Clone)]
pub struct GisClient {
    client: Client,
}

impl GisClient {
    pub fn new(request_timeout_seconds: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout_seconds))
            .connect_timeout(http::CONNECT_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client })
    }

    /// Admin token for a GIS server, bound to the requesting IP
    #[instrument(skip(self, server), fields(server = %server.name))]
    pub async fn generate_server_token(&self, server: &ServerConfig) -> Result<String, GisError> {
        let url = server.admin_endpoint("generateToken");
        let params = [
            ("username", server.username.clone()),
            ("password", server.password.clone()),
            ("client", "requestip".to_string()),
            ("f", "json".to_string()),
        ];

        let response: TokenResponse = self.post_form(&url, &params).await?;
        debug!("Generated admin token for {}", server.name);
        Ok(response.token)
    }

    /// Portal token used for feature-service edits
    #[instrument(skip(self, portal))]
    pub async fn generate_portal_token(&self, portal: &PortalConfig) -> Result<String, GisError> {
        let referer = portal
            .referer
            .clone()
            .unwrap_or_else(|| portal.token_url.clone());
        let params = [
            ("username", portal.username.clone()),
            ("password", portal.password.clone()),
            ("client", "referer".to_string()),
            ("referer", referer),
            ("expiration", portal.token_expiration_minutes.to_string()),
            ("f", "json".to_string()),
        ];

        let response: TokenResponse = self.post_form(&portal.token_url, &params).await?;
        debug!("Generated portal token");
        Ok(response.token)
    }

    /// Fetch one batch of log messages between `start_time` (newest) and
    /// `end_time` (oldest), both in epoch milliseconds
    pub async fn query_logs(
        &self,
        server: &ServerConfig,
        token: &str,
        start_time: i64,
        end_time: i64,
    ) -> Result<LogPage, GisError> {
        let url = server.admin_endpoint("logs/query");
        let params = [
            ("level", server.log_level.clone()),
            ("startTime", start_time.to_string()),
            ("endTime", end_time.to_string()),
            ("filter", logs::LOG_FILTER.to_string()),
            ("pageSize", server.log_page_size.to_string()),
            ("token", token.to_string()),
            ("f", "json".to_string()),
        ];

        debug!(
            "Querying logs on {} from {} back to {}",
            server.name, start_time, end_time
        );
        self.post_form(&url, &params).await
    }

    /// Service folders, starting with the root folder `""`
    pub async fn list_folders(
        &self,
        server: &ServerConfig,
        token: &str,
    ) -> Result<Vec<String>, GisError> {
        let url = server.admin_endpoint("services");
        let listing: FolderListing = self.post_form(&url, &token_params(token)).await?;

        let mut folders = vec![String::new()];
        folders.extend(listing.folders);
        Ok(folders)
    }

    pub async fn list_services(
        &self,
        server: &ServerConfig,
        token: &str,
        folder: &str,
    ) -> Result<Vec<ServiceEntry>, GisError> {
        let url = if folder.is_empty() {
            server.admin_endpoint("services")
        } else {
            server.admin_endpoint(&format!("services/{}", folder))
        };
        let listing: ServiceListing = self.post_form(&url, &token_params(token)).await?;
        Ok(listing.services)
    }

    pub async fn service_status(
        &self,
        server: &ServerConfig,
        token: &str,
        folder: &str,
        service: &ServiceEntry,
    ) -> Result<ServiceStatus, GisError> {
        let url = if folder.is_empty() {
            server.admin_endpoint(&format!("services/{}/status", service.qualified_name()))
        } else {
            server.admin_endpoint(&format!(
                "services/{}/{}/status",
                folder,
                service.qualified_name()
            ))
        };
        self.post_form(&url, &token_params(token)).await
    }

    /// Add features (`{"attributes": {...}}` objects) to a feature-service layer
    #[instrument(skip(self, token, features), fields(count = features.len()))]
    pub async fn add_features<T: Serialize>(
        &self,
        table_url: &str,
        token: &str,
        features: &[T],
    ) -> Result<EditSummary, GisError> {
        if features.is_empty() {
            return Ok(EditSummary::default());
        }

        let url = layer_endpoint(table_url, "addFeatures");
        let features_json =
            serde_json::to_string(features).map_err(|e| GisError::InvalidResponse {
                url: url.clone(),
                reason: format!("could not encode features: {}", e),
            })?;

        let params = [
            ("features", features_json),
            ("token", token.to_string()),
            ("f", "json".to_string()),
        ];

        let response: AddFeaturesResponse = self.post_form(&url, &params).await?;
        let summary = EditSummary::from_results(&response.add_results);
        log_edit_failures(&url, &response.add_results);
        Ok(summary)
    }

    /// Number of features matching a where clause
    pub async fn count_features(
        &self,
        table_url: &str,
        token: &str,
        where_clause: &str,
    ) -> Result<u64, GisError> {
        let url = layer_endpoint(table_url, "query");
        let params = [
            ("where", where_clause.to_string()),
            ("returnCountOnly", "true".to_string()),
            ("token", token.to_string()),
            ("f", "json".to_string()),
        ];

        let response: CountResponse = self.post_form(&url, &params).await?;
        Ok(response.count)
    }

    pub async fn delete_features(
        &self,
        table_url: &str,
        token: &str,
        where_clause: &str,
    ) -> Result<EditSummary, GisError> {
        let url = layer_endpoint(table_url, "deleteFeatures");
        let params = [
            ("where", where_clause.to_string()),
            ("token", token.to_string()),
            ("f", "json".to_string()),
        ];

        let response: DeleteFeaturesResponse = self.post_form(&url, &params).await?;
        if response.delete_results.is_empty() && response.success == Some(false) {
            return Err(GisError::ServerError {
                url,
                messages: vec!["deleteFeatures reported success=false".to_string()],
            });
        }

        log_edit_failures(&url, &response.delete_results);
        Ok(EditSummary::from_results(&response.delete_results))
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, GisError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "text/plain, application/json")
            .form(params)
            .send()
            .await
            .map_err(|e| GisError::ConnectionFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GisError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GisError::InvalidResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let value: Value = serde_json::from_str(&body).map_err(|e| GisError::InvalidResponse {
            url: url.to_string(),
            reason: format!("body is not JSON: {}", e),
        })?;

        check_json_success(url, &value)?;

        serde_json::from_value(value).map_err(|e| GisError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Reject the two error document shapes the platform returns with HTTP 200:
/// admin API `{"status": "error", "messages": [...]}` and portal / feature
/// service `{"error": {"code": ..., "message": ..., "details": [...]}}`.
pub fn check_json_success(url: &str, value: &Value) -> Result<(), GisError> {
    if value.get("status").and_then(Value::as_str) == Some("error") {
        let mut messages = string_list(value.get("messages"));
        if messages.is_empty() {
            messages.push("unknown error".to_string());
        }
        return Err(GisError::ServerError {
            url: url.to_string(),
            messages,
        });
    }

    if let Some(error) = value.get("error").filter(|e| e.is_object()) {
        return Err(GisError::ApiError {
            url: url.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
            details: string_list(error.get("details")),
        });
    }

    Ok(())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn token_params(token: &str) -> [(&'static str, String); 2] {
    [("token", token.to_string()), ("f", "json".to_string())]
}

fn layer_endpoint(table_url: &str, operation: &str) -> String {
    format!("{}/{}", table_url.trim_end_matches('/'), operation)
}

fn log_edit_failures(url: &str, results: &[super::types::EditResult]) {
    for result in results.iter().filter(|r| !r.success) {
        let object = result
            .object_id
            .map(|id| format!("object {}", id))
            .unwrap_or_else(|| "new object".to_string());
        match &result.error {
            Some(error) => warn!(
                "Edit of {} failed on {} (code {}): {}",
                object, url, error.code, error.description
            ),
            None => warn!("Edit of {} failed on {} without error details", object, url),
        }
    }
}
