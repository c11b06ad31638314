//! HTTP request handlers for the stats manager API.
//!
//! - `common` - Response envelope, query structs and error mapping
//! - `health` - Liveness endpoint
//! - `runs` - Job history and runs in progress
//! - `jobs` - Manual job execution

pub mod common;
pub mod health;
pub mod jobs;
pub mod runs;

pub use health::*;
pub use jobs::*;
pub use runs::*;
