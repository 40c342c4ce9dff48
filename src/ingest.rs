//! ==============================================================================
//! ingest.rs - payload validation and normalization
//! ==============================================================================
//!
//! purpose:
//!     sensor nodes report readings two ways:
//!     - POST /api/sensor-data with a json body
//!     - GET  /api/sensor-data?device_id=..&temperature=..&humidity=..
//!
//!     both are normalized here into one `ReadingCandidate` so the store has a
//!     single append path. validation happens completely before the store is
//!     touched: a payload is either admitted whole or rejected with nothing
//!     written.
//!
//! accepted shapes:
//!     device_id    string (or number), non-blank            required
//!     temperature  number or numeric string                 required
//!     humidity     number or numeric string                 required
//!     timestamp    non-negative number or numeric string    optional, else receipt time
//!     location     string                                   optional, else "Unknown"
//!
//! ==============================================================================

use crate::domain::ReadingCandidate;
use crate::error::ValidationError;
use serde::Deserialize;
use serde_json::Value;

/// json body of POST /api/sensor-data
///
/// fields are kept loosely typed because microcontroller firmware is
/// inconsistent about quoting numbers.
#[derive(Debug, Default, Deserialize)]
pub struct BodyPayload {
    #[serde(default)]
    pub device_id: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub humidity: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
}

/// query string of GET /api/sensor-data
#[derive(Debug, Default, Deserialize)]
pub struct QueryPayload {
    pub device_id: Option<String>,
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub timestamp: Option<String>,
    pub location: Option<String>,
}

/// a raw field after transport decoding, before number parsing
enum Field {
    Number(f64),
    Text(String),
}

impl Field {
    fn from_json(value: Option<Value>) -> Option<Field> {
        match value? {
            Value::Number(n) => n.as_f64().map(Field::Number),
            Value::String(s) => Field::from_text(Some(s)),
            _ => None,
        }
    }

    /// empty strings count as absent
    fn from_text(value: Option<String>) -> Option<Field> {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Field::Text)
    }

    fn into_text(self) -> String {
        match self {
            Field::Number(n) => n.to_string(),
            Field::Text(s) => s,
        }
    }

    fn to_number(&self) -> Option<f64> {
        let n = match self {
            Field::Number(n) => *n,
            Field::Text(s) => s.parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }
}

struct RawReading {
    device_id: Option<Field>,
    temperature: Option<Field>,
    humidity: Option<Field>,
    timestamp: Option<Field>,
    location: Option<String>,
}

impl BodyPayload {
    pub fn into_candidate(self) -> Result<ReadingCandidate, ValidationError> {
        let location = match self.location {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        normalize(RawReading {
            device_id: Field::from_json(self.device_id),
            temperature: Field::from_json(self.temperature),
            humidity: Field::from_json(self.humidity),
            timestamp: Field::from_json(self.timestamp),
            location,
        })
    }
}

impl QueryPayload {
    pub fn into_candidate(self) -> Result<ReadingCandidate, ValidationError> {
        normalize(RawReading {
            device_id: Field::from_text(self.device_id),
            temperature: Field::from_text(self.temperature),
            humidity: Field::from_text(self.humidity),
            timestamp: Field::from_text(self.timestamp),
            location: self.location,
        })
    }
}

fn normalize(raw: RawReading) -> Result<ReadingCandidate, ValidationError> {
    let mut missing = Vec::new();
    if raw.device_id.is_none() {
        missing.push("device_id");
    }
    if raw.temperature.is_none() {
        missing.push("temperature");
    }
    if raw.humidity.is_none() {
        missing.push("humidity");
    }

    let (Some(device_id), Some(temperature), Some(humidity)) =
        (raw.device_id, raw.temperature, raw.humidity)
    else {
        return Err(ValidationError::MissingFields(missing));
    };

    let temperature = number("temperature", temperature)?;
    let humidity = number("humidity", humidity)?;

    Ok(ReadingCandidate {
        device_id: device_id.into_text(),
        temperature,
        humidity,
        location: raw.location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
        timestamp: raw.timestamp.and_then(|t| timestamp(&t)),
    })
}

fn number(field: &'static str, value: Field) -> Result<f64, ValidationError> {
    value.to_number().ok_or_else(|| ValidationError::InvalidNumber {
        field,
        value: value.into_text(),
    })
}

/// invalid markers fall back to receipt time instead of rejecting the reading
fn timestamp(value: &Field) -> Option<u64> {
    value
        .to_number()
        .filter(|t| *t >= 0.0 && *t <= u64::MAX as f64)
        .map(|t| t as u64)
}

/// `?limit=` for the list endpoints; non-numeric or zero means `default`
///
/// the whole value must be digits: "10abc" is non-numeric.
pub fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
