//! Test database utilities for in-memory SQLite testing

use std::sync::Arc;

use gis_stats_manager::Database;

/// Job history database kept in memory for the lifetime of a test
pub struct TestDatabase;

impl TestDatabase {
    pub async fn new() -> Arc<Database> {
        Arc::new(
            Database::in_memory()
                .await
                .expect("Failed to create in-memory database"),
        )
    }
}
