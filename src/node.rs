//! ==============================================================================
//! node.rs - sensor node role (pushes readings to a hub)
//! ==============================================================================
//!
//! purpose:
//!     a node is the other end of the ingestion api: it samples a sensor on a
//!     fixed interval and POSTs each sample to `{hub_url}/api/sensor-data`.
//!     real deployments run this on the microcontroller firmware; this module
//!     lets a linux box (or a dev machine) act as a node, with a mock sensor
//!     standing in for the dht22.
//!
//! relationships:
//!     - used by: main.rs (when cluster.role = "node"), tests/api.rs
//!     - talks to: server.rs over http
//!
//! ==============================================================================

use crate::config::HubConfig;
use crate::domain::{now_ms, Reading};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// body a node sends to POST /api/sensor-data
#[derive(Clone, Serialize, Debug)]
pub struct NodeSample {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    data: Option<Reading>,
    error: Option<String>,
}

// ==============================================================================
// hub client
// ==============================================================================

#[derive(Clone)]
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// push one sample and return the reading the hub stored
    pub async fn push(&self, sample: &NodeSample) -> Result<Reading> {
        let url = format!("{}/api/sensor-data", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(sample)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status();
        let envelope: Envelope = response
            .json()
            .await
            .with_context(|| format!("hub returned a non-envelope body ({})", status))?;

        match envelope {
            Envelope { success: true, data: Some(reading), .. } => Ok(reading),
            Envelope { error, .. } => Err(anyhow!(
                "hub rejected reading ({}): {}",
                status,
                error.unwrap_or_else(|| "no error message".to_string())
            )),
        }
    }

    /// true when the hub answers its health endpoint
    pub async fn is_alive(&self) -> bool {
        let url = format!("{}/api/health", self.base_url);
        match self.http.get(&url).send().await {
            Ok(r) => r.status().is_success(),
            Err(_) => false,
        }
    }
}

// ==============================================================================
// mock sensor
// ==============================================================================

/// stands in for a dht22 when no hardware is attached
///
/// produces a slow triangle wave around 25°C / 50% so charts have
/// something to draw.
#[derive(Default)]
pub struct MockSensor {
    tick: u32,
}

impl MockSensor {
    pub fn read(&mut self) -> (f64, f64) {
        let phase = (self.tick % 20) as f64;
        let offset = if phase < 10.0 { phase } else { 20.0 - phase } - 5.0;
        self.tick = self.tick.wrapping_add(1);
        (25.0 + offset * 0.3, 50.0 - offset)
    }
}

/// push loop for the node role; runs until the process is stopped
pub async fn run_node(config: &HubConfig) -> Result<()> {
    let client = HubClient::new(&config.cluster.hub_url)?;
    let interval = Duration::from_secs(config.polling.interval_seconds.max(1));
    let mut sensor = MockSensor::default();

    if !client.is_alive().await {
        tracing::warn!("[NODE] hub at {} is not answering yet, will keep trying", config.cluster.hub_url);
    }

    tracing::info!(
        "[NODE] {} pushing to {} every {}s",
        config.cluster.node_id,
        config.cluster.hub_url,
        interval.as_secs()
    );

    loop {
        let (temperature, humidity) = sensor.read();
        let sample = NodeSample {
            device_id: config.cluster.node_id.clone(),
            temperature,
            humidity,
            timestamp: Some(now_ms()),
            location: config.cluster.location.clone(),
        };

        match client.push(&sample).await {
            Ok(reading) => {
                if config.logging.show_sensor_data {
                    tracing::info!(
                        "[NODE] stored #{} Temp: {:.1}°C | Humidity: {:.1}%",
                        reading.id,
                        reading.temperature,
                        reading.humidity
                    );
                }
            }
            Err(e) => tracing::warn!("[NODE] ⚠ push failed: {:#}", e),
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_sensor_stays_in_plausible_range() {
        let mut sensor = MockSensor::default();
        for _ in 0..100 {
            let (t, h) = sensor.read();
            assert!((23.0..=27.0).contains(&t), "temperature {}", t);
            assert!((40.0..=60.0).contains(&h), "humidity {}", h);
        }
    }

    #[test]
    fn sample_omits_absent_optionals() {
        let sample = NodeSample {
            device_id: "esp32-1".into(),
            temperature: 24.5,
            humidity: 60.0,
            timestamp: None,
            location: None,
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert!(json.get("timestamp").is_none());
        assert!(json.get("location").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HubClient::new("http://hub.local:3000/").unwrap();
        assert_eq!(client.base_url, "http://hub.local:3000");
    }
}
