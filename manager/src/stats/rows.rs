//! Stat rows as written to feature-service tables.
//!
//! Every row is wrapped in [`Feature`] so it serializes to the
//! `{"attributes": {...}}` shape expected by `addFeatures`.

use serde::Serialize;

/// Date field present on every row; the clean-up job filters on it
pub const STAT_DATE_FIELD: &str = "StatDateUTC";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Feature<T> {
    pub attributes: T,
}

impl<T> Feature<T> {
    pub fn new(attributes: T) -> Self {
        Self { attributes }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodStatsRow {
    #[serde(rename = "StatDateUTC")]
    pub stat_date: String,
    #[serde(rename = "ServicesRequested")]
    pub services_requested: u64,
    #[serde(rename = "LayersDrawn")]
    pub layers_drawn: u64,
    #[serde(rename = "AvgLayerDrawTime")]
    pub avg_layer_draw_time: f64,
    #[serde(rename = "Errors")]
    pub errors: u64,
    #[serde(rename = "Warnings")]
    pub warnings: u64,
}

/// One SEVERE or WARNING log message
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogDetailRow {
    #[serde(rename = "StatDateUTC")]
    pub stat_date: String,
    #[serde(rename = "LogDateUTC")]
    pub log_time: i64,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Code")]
    pub code: i64,
    #[serde(rename = "GISUser")]
    pub user: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceCountRow {
    #[serde(rename = "StatDateUTC")]
    pub stat_date: String,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "RequestCount")]
    pub request_count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LayerCountRow {
    #[serde(rename = "StatDateUTC")]
    pub stat_date: String,
    #[serde(rename = "Layer")]
    pub layer: String,
    #[serde(rename = "DrawCount")]
    pub draw_count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LayerDrawTimeRow {
    #[serde(rename = "StatDateUTC")]
    pub stat_date: String,
    #[serde(rename = "Layer")]
    pub layer: String,
    #[serde(rename = "AvgDrawTime")]
    pub avg_draw_time: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceStatusRow {
    #[serde(rename = "StatDateUTC")]
    pub stat_date: String,
    #[serde(rename = "ServicesUp")]
    pub services_up: u64,
    #[serde(rename = "ServicesDown")]
    pub services_down: u64,
    #[serde(rename = "TotalServices")]
    pub total_services: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceDownRow {
    #[serde(rename = "StatDateUTC")]
    pub stat_date: String,
    #[serde(rename = "Service")]
    pub service: String,
}
