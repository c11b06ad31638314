// File: manager/src/web/mod.rs
pub mod handlers;
pub mod server;

pub use server::{create_router, start_web_server};

use std::sync::Arc;

use crate::config::Config;
use crate::database::Database;
use crate::services::JobRunner;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Arc<Database>,
    pub job_runner: Arc<JobRunner>,
}

impl AppState {
    pub fn new(config: Arc<Config>, database: Arc<Database>, job_runner: Arc<JobRunner>) -> Self {
        Self {
            config,
            database,
            job_runner,
        }
    }
}
