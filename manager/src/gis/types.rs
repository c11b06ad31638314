//! REST response structures for the GIS server admin API, the portal and
//! feature services

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Token returned by `generateToken` on the server admin API or the portal
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// One batch of log messages from `admin/logs/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub log_messages: Vec<LogMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub message_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    pub time: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user: String,
    #[serde(default)]
    pub code: i64,
    /// Seconds; the server sends a string, sometimes empty
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub elapsed: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderListing {
    #[serde(default)]
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceListing {
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub service_name: String,
    #[serde(rename = "type")]
    pub service_type: String,
}

impl ServiceEntry {
    /// `name.Type`, the form used in admin URLs and stat rows
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.service_name, self.service_type)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub configured_state: String,
    pub real_time_state: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    pub object_id: Option<i64>,
    #[serde(default)]
    pub success: bool,
    pub error: Option<EditError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFeaturesResponse {
    #[serde(default)]
    pub add_results: Vec<EditResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFeaturesResponse {
    #[serde(default)]
    pub delete_results: Vec<EditResult>,
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Outcome of an add or delete edit against a feature service
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct EditSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl EditSummary {
    pub fn from_results(results: &[EditResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
