// File: manager/src/web/server.rs
use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server(state: AppState) -> Result<()> {
    let app = create_router(state.clone());
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // === HEALTH ===
        .route("/api/health", get(handlers::get_health))
        // === JOB HISTORY ===
        .route("/api/runs", get(handlers::get_recent_runs))
        .route("/api/runs/active", get(handlers::get_active_runs))
        .route("/api/runs/{run_id}", get(handlers::get_run))
        // === MANUAL JOB RUNS ===
        .route("/api/jobs/{job}/run", post(handlers::run_job))
        // Add middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
