//! Common test data and constants

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

/// Common test server names
pub mod servers {
    pub const INTGIS: &str = "intgis";
    pub const PUBLICGIS: &str = "publicgis";
}

/// The stats feature service's own requests, excluded from the counts
pub const STATS_SERVICE: &str = "Stats/ArcGISStats.FeatureServer";

/// 2020-01-10 10:15:00 UTC, a fixed end of the stats window
pub fn window_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 10, 10, 15, 0).unwrap()
}

/// `window_end()` in epoch milliseconds
pub const WINDOW_START_MS: i64 = 1_578_651_300_000;

/// Oldest millisecond of the 15 minute window ending at `window_end()`
pub const WINDOW_END_MS: i64 = WINDOW_START_MS - 15 * 60 * 1000 + 1;

pub fn log_message(time: i64, message_type: &str, code: i64, message: &str, source: &str) -> Value {
    json!({
        "type": message_type,
        "message": message,
        "time": time,
        "source": source,
        "machine": "GIS01.EXAMPLE.COM",
        "user": "jsmith",
        "code": code,
        "elapsedTime": "",
        "process": "4321",
        "thread": "1",
        "methodName": "",
        "elapsed": ""
    })
}

pub fn service_request(time: i64, service: &str) -> Value {
    log_message(
        time,
        "FINE",
        9029,
        &format!("Request received. Service: {}", service),
        "Rest",
    )
}

/// Layer draw with `elapsed` sent as a string, the way the server does
pub fn layer_draw(time: i64, layer: &str, elapsed: &str) -> Value {
    let mut message = log_message(time, "FINE", 100004, "End ExportMapImage", layer);
    message["elapsed"] = json!(elapsed);
    message
}

pub fn severe(time: i64, message: &str, source: &str) -> Value {
    log_message(time, "SEVERE", 9000, message, source)
}

pub fn warning(time: i64, message: &str, source: &str) -> Value {
    log_message(time, "WARNING", 8001, message, source)
}
