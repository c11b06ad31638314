// Common types and utilities for API handlers

use axum::{http::StatusCode, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::errors::{JobError, ManagerError};

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub fn error_response(status: StatusCode, message: String) -> (StatusCode, Json<ApiResponse<()>>) {
    (status, Json(ApiResponse::error(message)))
}

/// Bad requests and conflicts are the caller's problem; anything else is ours
pub fn status_for(error: &ManagerError) -> StatusCode {
    match error {
        ManagerError::Job(JobError::Busy { .. }) => StatusCode::CONFLICT,
        ManagerError::Job(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Query parameters
#[derive(Deserialize)]
pub struct RecentRunsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub job: Option<String>,
}

fn default_limit() -> i64 {
    defaults::RECENT_RUNS_LIMIT
}

#[derive(Deserialize)]
pub struct JobRunQuery {
    pub server: Option<String>,
}
