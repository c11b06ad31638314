//! Aggregation of one window of server log messages into usage statistics

use serde::Serialize;
use std::collections::HashMap;

use super::rows::{
    Feature, LayerCountRow, LayerDrawTimeRow, LogDetailRow, PeriodStatsRow, ServiceCountRow,
};
use crate::constants::logs;
use crate::gis::LogMessage;

/// Per-layer draw time accumulator, kept in first-seen order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LayerDrawTime {
    pub layer: String,
    pub total_draw_time: f64,
    pub draw_count: u64,
}

impl LayerDrawTime {
    pub fn average(&self) -> f64 {
        if self.draw_count == 0 {
            0.0
        } else {
            self.total_draw_time / self.draw_count as f64
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UsageStats {
    pub stat_date: String,
    pub services_requested: u64,
    pub layers_drawn: u64,
    pub total_draw_time: f64,
    pub errors: Vec<LogDetailRow>,
    pub warnings: Vec<LogDetailRow>,
    /// (service, requests), most requested first
    pub service_counts: Vec<(String, u64)>,
    /// (layer, draws), most drawn first
    pub layer_counts: Vec<(String, u64)>,
    pub layer_draw_times: Vec<LayerDrawTime>,
}

/// Aggregate log messages for one stat date.
///
/// Requests for services whose message ends with one of `excluded_services`
/// are ignored; that is how the stats feature service keeps its own edits
/// out of the counts.
pub fn aggregate(
    mut messages: Vec<LogMessage>,
    stat_date: &str,
    excluded_services: &[String],
) -> UsageStats {
    messages.sort_by_key(|m| m.time);

    let mut stats = UsageStats {
        stat_date: stat_date.to_string(),
        ..Default::default()
    };
    let mut service_counts: HashMap<String, u64> = HashMap::new();
    let mut layer_counts: HashMap<String, u64> = HashMap::new();
    let mut layer_index: HashMap<String, usize> = HashMap::new();

    for item in &messages {
        if item.code == logs::SERVICE_REQUESTED_CODE
            && !excluded_services
                .iter()
                .any(|suffix| item.message.ends_with(suffix.as_str()))
        {
            stats.services_requested += 1;
            *service_counts
                .entry(requested_service_name(&item.message))
                .or_insert(0) += 1;
        }

        if item.message == logs::END_EXPORT_MAP_IMAGE {
            let elapsed = item.elapsed.unwrap_or(0.0);
            stats.layers_drawn += 1;
            stats.total_draw_time += elapsed;
            *layer_counts.entry(item.source.clone()).or_insert(0) += 1;

            match layer_index.get(&item.source) {
                Some(&idx) => {
                    let entry = &mut stats.layer_draw_times[idx];
                    entry.total_draw_time += elapsed;
                    entry.draw_count += 1;
                }
                None => {
                    layer_index.insert(item.source.clone(), stats.layer_draw_times.len());
                    stats.layer_draw_times.push(LayerDrawTime {
                        layer: item.source.clone(),
                        total_draw_time: elapsed,
                        draw_count: 1,
                    });
                }
            }
        }

        if item.message_type == logs::TYPE_SEVERE {
            stats.errors.push(detail_row(stat_date, item));
        } else if item.message_type == logs::TYPE_WARNING {
            stats.warnings.push(detail_row(stat_date, item));
        }
    }

    stats.service_counts = sorted_counts(service_counts);
    stats.layer_counts = sorted_counts(layer_counts);
    stats
}

fn requested_service_name(message: &str) -> String {
    match message.find(logs::SERVICE_MARKER) {
        Some(pos) => message[pos + logs::SERVICE_MARKER.len()..].trim().to_string(),
        None => message.trim().to_string(),
    }
}

fn detail_row(stat_date: &str, item: &LogMessage) -> LogDetailRow {
    LogDetailRow {
        stat_date: stat_date.to_string(),
        log_time: item.time,
        message: item.message.clone(),
        source: item.source.clone(),
        code: item.code,
        user: item.user.clone(),
    }
}

fn sorted_counts(counts: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut counts: Vec<(String, u64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

impl UsageStats {
    pub fn avg_draw_time(&self) -> f64 {
        if self.layers_drawn == 0 {
            0.0
        } else {
            self.total_draw_time / self.layers_drawn as f64
        }
    }

    pub fn period_row(&self) -> Feature<PeriodStatsRow> {
        Feature::new(PeriodStatsRow {
            stat_date: self.stat_date.clone(),
            services_requested: self.services_requested,
            layers_drawn: self.layers_drawn,
            avg_layer_draw_time: self.avg_draw_time(),
            errors: self.errors.len() as u64,
            warnings: self.warnings.len() as u64,
        })
    }

    pub fn error_rows(&self) -> Vec<Feature<LogDetailRow>> {
        self.errors.iter().cloned().map(Feature::new).collect()
    }

    pub fn warning_rows(&self) -> Vec<Feature<LogDetailRow>> {
        self.warnings.iter().cloned().map(Feature::new).collect()
    }

    pub fn service_count_rows(&self) -> Vec<Feature<ServiceCountRow>> {
        self.service_counts
            .iter()
            .map(|(service, count)| {
                Feature::new(ServiceCountRow {
                    stat_date: self.stat_date.clone(),
                    service: service.clone(),
                    request_count: *count,
                })
            })
            .collect()
    }

    pub fn layer_count_rows(&self) -> Vec<Feature<LayerCountRow>> {
        self.layer_counts
            .iter()
            .map(|(layer, count)| {
                Feature::new(LayerCountRow {
                    stat_date: self.stat_date.clone(),
                    layer: layer.clone(),
                    draw_count: *count,
                })
            })
            .collect()
    }

    pub fn layer_draw_time_rows(&self) -> Vec<Feature<LayerDrawTimeRow>> {
        self.layer_draw_times
            .iter()
            .map(|entry| {
                Feature::new(LayerDrawTimeRow {
                    stat_date: self.stat_date.clone(),
                    layer: entry.layer.clone(),
                    avg_draw_time: entry.average(),
                })
            })
            .collect()
    }
}
