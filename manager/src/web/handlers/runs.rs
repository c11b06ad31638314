// Job history endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::error;

use super::common::{error_response, ApiResponse, ApiResult, RecentRunsQuery};
use crate::database::JobRun;
use crate::run_tracker::RunTrackerStatus;
use crate::services::Job;
use crate::web::AppState;

const MAX_RUNS_LIMIT: i64 = 500;

/// Most recent job runs, newest first
pub async fn get_recent_runs(
    Query(query): Query<RecentRunsQuery>,
    State(state): State<AppState>,
) -> ApiResult<Vec<JobRun>> {
    let job = match query.job.as_deref() {
        Some(name) => match name.parse::<Job>() {
            Ok(job) => Some(job),
            Err(e) => return Err(error_response(StatusCode::BAD_REQUEST, e.to_string())),
        },
        None => None,
    };
    let limit = query.limit.clamp(1, MAX_RUNS_LIMIT);

    match state
        .database
        .recent_job_runs(limit, job.as_ref().map(Job::as_str))
        .await
    {
        Ok(runs) => Ok(Json(ApiResponse::success(runs))),
        Err(e) => {
            error!("Failed to load job runs: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ))
        }
    }
}

pub async fn get_run(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<JobRun> {
    match state.database.get_job_run(&run_id).await {
        Ok(Some(run)) => Ok(Json(ApiResponse::success(run))),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Job run '{}' not found", run_id),
        )),
        Err(e) => {
            error!("Failed to load job run {}: {}", run_id, e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ))
        }
    }
}

/// Runs currently in progress
pub async fn get_active_runs(State(state): State<AppState>) -> ApiResult<RunTrackerStatus> {
    let status = state.job_runner.run_tracker().status().await;
    Ok(Json(ApiResponse::success(status)))
}
