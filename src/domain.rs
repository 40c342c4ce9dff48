use serde::{Deserialize, Serialize};

/// location recorded when a node doesn't report one
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// one stored sensor observation
///
/// readings are created only by `ReadingStore::append` (or loaded from a
/// snapshot) and never mutated afterwards.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Reading {
    /// store-assigned identifier, unique for the life of the snapshot
    pub id: u64,

    /// originating node (e.g., "esp32-1")
    pub device_id: String,

    /// temperature in celsius
    pub temperature: f64,

    /// relative humidity (0-100%)
    pub humidity: f64,

    /// free-form placement label, "Unknown" when not reported
    pub location: String,

    /// caller-supplied time marker in milliseconds
    /// (falls back to receipt time)
    pub timestamp: u64,

    /// unix timestamp (ms) when the hub accepted the reading
    pub received_at: u64,
}

/// a normalized, validated reading that hasn't been stored yet
///
/// the ingestion layer builds these from either transport variant;
/// the store fills in `id` and `received_at`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadingCandidate {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub location: Option<String>,
    pub timestamp: Option<u64>,
}

/// min / max / average over one measurement
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    /// rounded to 2 decimal places
    pub avg: f64,
}

/// aggregate view over the whole store
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Stats {
    pub total_readings: usize,
    pub temperature: Summary,
    pub humidity: Summary,
    /// each device seen, once, in first-seen order
    pub devices: Vec<String>,
    pub latest_reading: Reading,
}

/// round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// get current timestamp in milliseconds (unix epoch)
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
