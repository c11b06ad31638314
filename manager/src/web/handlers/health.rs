// Liveness endpoint

use axum::{extract::State, response::Json};
use serde::Serialize;

use super::common::{ApiResponse, ApiResult};
use crate::config::ScheduleConfig;
use crate::web::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthInfo {
    pub status: String,
    pub version: String,
    pub servers: Vec<String>,
    pub schedules: ScheduleConfig,
    pub active_runs: usize,
}

pub async fn get_health(State(state): State<AppState>) -> ApiResult<HealthInfo> {
    let active = state.job_runner.run_tracker().status().await;

    Ok(Json(ApiResponse::success(HealthInfo {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        servers: state.config.server_names(),
        schedules: state.config.schedules.clone(),
        active_runs: active.total_active,
    })))
}
