//! Usage statistics: the queried time window, the log aggregation and the
//! rows written to feature-service tables

pub mod aggregate;
pub mod rows;
pub mod window;

pub use aggregate::{aggregate, LayerDrawTime, UsageStats};
pub use rows::{Feature, STAT_DATE_FIELD};
pub use window::StatWindow;
