//! Mock GIS deployment for testing the REST client and the jobs
//!
//! One wiremock server plays the server admin API (`/arcgis/admin/...`), the
//! portal token endpoint and the stats feature service layers.

use serde_json::{json, Value};
use std::collections::HashMap;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

pub const SERVER_TOKEN: &str = "server-token-123";
pub const PORTAL_TOKEN: &str = "portal-token-456";

/// Layer index of each stats table in the mock feature service
pub mod layers {
    pub const STATS_PER_TIME_PERIOD: u32 = 0;
    pub const ERRORS: u32 = 1;
    pub const WARNINGS: u32 = 2;
    pub const SERVICES_REQUESTED: u32 = 3;
    pub const LAYERS_DRAWN: u32 = 4;
    pub const AVG_LAYER_DRAW_TIME: u32 = 5;
    pub const SERVICES_STATUS: u32 = 6;
    pub const SERVICES_DOWN: u32 = 7;
}

pub struct MockGisServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockGisServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    pub fn admin_url(&self) -> String {
        format!("{}/arcgis", self.base_url)
    }

    pub fn portal_token_url(&self) -> String {
        format!("{}/portal/sharing/rest/generateToken", self.base_url)
    }

    pub fn table_path(layer: u32) -> String {
        format!("/arcgis/rest/services/Stats/FeatureServer/{}", layer)
    }

    pub fn table_url(&self, layer: u32) -> String {
        format!("{}{}", self.base_url, Self::table_path(layer))
    }

    /// Admin token endpoint accepting any credentials
    pub async fn mock_server_token(&self) {
        Mock::given(method("POST"))
            .and(path("/arcgis/admin/generateToken"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"token": SERVER_TOKEN, "expires": 1893456000000i64})),
            )
            .mount(&self.server)
            .await;
    }

    /// Admin token endpoint rejecting the credentials with HTTP 200
    pub async fn mock_server_token_rejected(&self) {
        Mock::given(method("POST"))
            .and(path("/arcgis/admin/generateToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "messages": ["Unable to generate token. Username or password is incorrect."],
                "code": 400
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_portal_token(&self) {
        Mock::given(method("POST"))
            .and(path("/portal/sharing/rest/generateToken"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"token": PORTAL_TOKEN, "expires": 1893456000000i64, "ssl": true})),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_portal_token_rejected(&self) {
        Mock::given(method("POST"))
            .and(path("/portal/sharing/rest/generateToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "Unable to generate token.",
                    "details": ["Invalid username or password."]
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Single log batch answering any log query
    pub async fn mock_logs(&self, messages: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path("/arcgis/admin/logs/query"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(log_page(messages, false)),
            )
            .mount(&self.server)
            .await;
    }

    /// Single log batch delivered after `delay`
    pub async fn mock_logs_delayed(&self, messages: Vec<Value>, delay: std::time::Duration) {
        Mock::given(method("POST"))
            .and(path("/arcgis/admin/logs/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(log_page(messages, false))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Log batch answering only the query that starts at `start_time`
    pub async fn mock_log_page(&self, start_time: i64, messages: Vec<Value>, has_more: bool) {
        Mock::given(method("POST"))
            .and(path("/arcgis/admin/logs/query"))
            .and(body_string_contains(format!("startTime={}", start_time)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(log_page(messages, has_more)),
            )
            .mount(&self.server)
            .await;
    }

    /// Log endpoint that always claims more data, answering each query with
    /// one service request at the requested `startTime`
    pub async fn mock_endless_logs(&self) {
        Mock::given(method("POST"))
            .and(path("/arcgis/admin/logs/query"))
            .respond_with(|req: &Request| {
                let start_time = form_params(req)
                    .get("startTime")
                    .and_then(|t| t.parse::<i64>().ok())
                    .unwrap_or_default();
                let message = super::test_data::service_request(start_time, "Basemaps/Aerial.MapServer");
                ResponseTemplate::new(200).set_body_json(log_page(vec![message], true))
            })
            .mount(&self.server)
            .await;
    }

    /// Root folder listing: sub folders plus the services in the root
    pub async fn mock_root_folder(&self, folders: &[&str], services: &[(&str, &str)]) {
        Mock::given(method("POST"))
            .and(path("/arcgis/admin/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "folderName": "/",
                "folders": folders,
                "services": service_entries(services)
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_folder(&self, folder: &str, services: &[(&str, &str)]) {
        Mock::given(method("POST"))
            .and(path(format!("/arcgis/admin/services/{}", folder)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "folderName": folder,
                "folders": [],
                "services": service_entries(services)
            })))
            .mount(&self.server)
            .await;
    }

    /// Status of `name.type` in `folder` (`""` for the root folder)
    pub async fn mock_service_status(
        &self,
        folder: &str,
        qualified_name: &str,
        configured_state: &str,
        real_time_state: &str,
    ) {
        let service_path = if folder.is_empty() {
            format!("/arcgis/admin/services/{}/status", qualified_name)
        } else {
            format!("/arcgis/admin/services/{}/{}/status", folder, qualified_name)
        };

        Mock::given(method("POST"))
            .and(path(service_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "configuredState": configured_state,
                "realTimeState": real_time_state
            })))
            .mount(&self.server)
            .await;
    }

    /// addFeatures that accepts every submitted feature
    pub async fn mock_add_features(&self, layer: u32) {
        Mock::given(method("POST"))
            .and(path(format!("{}/addFeatures", Self::table_path(layer))))
            .respond_with(|req: &Request| {
                let count = submitted_features(req).len();
                let results: Vec<Value> = (0..count)
                    .map(|i| json!({"objectId": i + 1, "success": true}))
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({ "addResults": results }))
            })
            .mount(&self.server)
            .await;
    }

    pub async fn mock_count(&self, layer: u32, count: u64) {
        Mock::given(method("POST"))
            .and(path(format!("{}/query", Self::table_path(layer))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": count })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_delete(&self, layer: u32, deleted: usize) {
        let results: Vec<Value> = (0..deleted)
            .map(|i| json!({"objectId": i + 1, "success": true}))
            .collect();
        Mock::given(method("POST"))
            .and(path(format!("{}/deleteFeatures", Self::table_path(layer))))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "deleteResults": results })),
            )
            .mount(&self.server)
            .await;
    }

    /// deleteFeatures answering with `deleted` successes and `rejected` per-row failures
    pub async fn mock_delete_partial(&self, layer: u32, deleted: usize, rejected: usize) {
        let results: Vec<Value> = (0..deleted + rejected)
            .map(|i| {
                if i < deleted {
                    json!({"objectId": i + 1, "success": true})
                } else {
                    json!({
                        "objectId": i + 1,
                        "success": false,
                        "error": {"code": 1003, "description": "Operation rolled back."}
                    })
                }
            })
            .collect();
        Mock::given(method("POST"))
            .and(path(format!("{}/deleteFeatures", Self::table_path(layer))))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "deleteResults": results })),
            )
            .mount(&self.server)
            .await;
    }

    /// addFeatures rejecting the last `rejected` submitted features
    pub async fn mock_add_features_partial(&self, layer: u32, rejected: usize) {
        Mock::given(method("POST"))
            .and(path(format!("{}/addFeatures", Self::table_path(layer))))
            .respond_with(move |req: &Request| {
                let count = submitted_features(req).len();
                let results: Vec<Value> = (0..count)
                    .map(|i| {
                        if i + rejected < count {
                            json!({"objectId": i + 1, "success": true})
                        } else {
                            json!({
                                "objectId": -1,
                                "success": false,
                                "error": {"code": 1000, "description": "Invalid attribute value."}
                            })
                        }
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({ "addResults": results }))
            })
            .mount(&self.server)
            .await;
    }

    /// Feature service error document for `operation` on a layer
    pub async fn mock_layer_error(&self, layer: u32, operation: &str) {
        Mock::given(method("POST"))
            .and(path(format!("{}/{}", Self::table_path(layer), operation)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {
                    "code": 500,
                    "message": "Unable to complete operation.",
                    "details": []
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Form parameters of every request received on `request_path`
    pub async fn requests_to(&self, request_path: &str) -> Vec<HashMap<String, String>> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path() == request_path)
            .map(form_params)
            .collect()
    }

    /// Features submitted to a layer's addFeatures, across all requests
    pub async fn features_added(&self, layer: u32) -> Vec<Value> {
        let add_path = format!("{}/addFeatures", Self::table_path(layer));
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path() == add_path)
            .flat_map(submitted_features)
            .collect()
    }
}

pub fn log_page(messages: Vec<Value>, has_more: bool) -> Value {
    json!({
        "hasMore": has_more,
        "startTime": messages.first().and_then(|m| m.get("time")).cloned(),
        "endTime": messages.last().and_then(|m| m.get("time")).cloned(),
        "logMessages": messages
    })
}

fn service_entries(services: &[(&str, &str)]) -> Vec<Value> {
    services
        .iter()
        .map(|(name, service_type)| json!({"serviceName": name, "type": service_type}))
        .collect()
}

/// Decode a form-encoded request body
pub fn form_params(req: &Request) -> HashMap<String, String> {
    let body = String::from_utf8_lossy(&req.body);
    reqwest::Url::parse(&format!("http://localhost/?{}", body))
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

fn submitted_features(req: &Request) -> Vec<Value> {
    form_params(req)
        .get("features")
        .and_then(|features| serde_json::from_str::<Vec<Value>>(features).ok())
        .unwrap_or_default()
}
