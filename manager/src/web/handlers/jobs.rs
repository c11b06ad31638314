// Manual job execution endpoint

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use super::common::{error_response, status_for, ApiResponse, ApiResult, JobRunQuery};
use crate::services::{Job, JobReport};
use crate::web::AppState;

/// Run a job now and answer with its report once it finishes
pub async fn run_job(
    Path(job_name): Path<String>,
    Query(query): Query<JobRunQuery>,
    State(state): State<AppState>,
) -> ApiResult<JobReport> {
    let job = job_name
        .parse::<Job>()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;

    info!(
        "Manual {} requested for {}",
        job,
        query.server.as_deref().unwrap_or("all")
    );

    match state.job_runner.run(job, query.server.as_deref()).await {
        Ok(report) => Ok(Json(ApiResponse::success(report))),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Manual {} failed: {}", job, e);
            } else {
                warn!("Manual {} rejected: {}", job, e);
            }
            Err(error_response(status, e.to_string()))
        }
    }
}
