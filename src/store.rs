//! ==============================================================================
//! store.rs - bounded in-memory reading store
//! ==============================================================================
//!
//! purpose:
//!     holds the most recent readings in arrival order and answers every
//!     query the api makes. this is the only place readings are created.
//!
//! retention:
//!     at most `capacity` readings are kept. appends go to the tail; once the
//!     store is over capacity the oldest readings are dropped from the head.
//!     surviving readings are never reordered or modified.
//!
//!         append ──► [ r1 r2 r3 ... rN ] ──► evict from head when N > capacity
//!                     oldest        newest
//!
//! relationships:
//!     - used by: server.rs (behind the hub mutex)
//!     - fed by: ingest.rs (ReadingCandidate), snapshot.rs (replace_all)
//!
//! ==============================================================================

use crate::domain::{now_ms, round2, Reading, ReadingCandidate, Stats, Summary, UNKNOWN_LOCATION};
use std::collections::{HashSet, VecDeque};

/// most recent readings retained in memory and in the snapshot
pub const MAX_RETAINED: usize = 1000;

/// readings returned by list queries when no limit is given
pub const DEFAULT_LIMIT: usize = 50;

#[derive(Debug)]
pub struct ReadingStore {
    readings: VecDeque<Reading>,
    capacity: usize,
    next_id: u64,
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::with_capacity(MAX_RETAINED)
    }
}

impl ReadingStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity.min(MAX_RETAINED)),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// store a validated candidate and return the stored reading
    pub fn append(&mut self, candidate: ReadingCandidate) -> Reading {
        let received_at = now_ms();
        let location = candidate
            .location
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

        let reading = Reading {
            id: self.next_id,
            device_id: candidate.device_id,
            temperature: candidate.temperature,
            humidity: candidate.humidity,
            location,
            timestamp: candidate.timestamp.unwrap_or(received_at),
            received_at,
        };
        self.next_id += 1;

        self.readings.push_back(reading.clone());
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
        reading
    }

    /// up to `limit` readings, newest first
    pub fn recent(&self, limit: usize) -> Vec<Reading> {
        self.readings.iter().rev().take(limit).cloned().collect()
    }

    /// up to `limit` readings from one device, newest first
    pub fn by_device(&self, device_id: &str, limit: usize) -> Vec<Reading> {
        self.readings
            .iter()
            .rev()
            .filter(|r| r.device_id == device_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// aggregate over every retained reading; `None` when the store is empty
    pub fn stats(&self) -> Option<Stats> {
        let latest = self.readings.back()?.clone();

        let mut temperature = Accumulator::default();
        let mut humidity = Accumulator::default();
        let mut seen = HashSet::new();
        let mut devices = Vec::new();

        for r in &self.readings {
            temperature.push(r.temperature);
            humidity.push(r.humidity);
            if seen.insert(r.device_id.as_str()) {
                devices.push(r.device_id.clone());
            }
        }

        Some(Stats {
            total_readings: self.readings.len(),
            temperature: temperature.summary(),
            humidity: humidity.summary(),
            devices,
            latest_reading: latest,
        })
    }

    /// swap in a previously persisted sequence wholesale
    ///
    /// loaded readings are trusted; only the capacity bound is re-applied,
    /// keeping the newest entries. the id counter resumes past the largest
    /// loaded id.
    pub fn replace_all(&mut self, readings: Vec<Reading>) {
        let skip = readings.len().saturating_sub(self.capacity);
        self.readings = readings.into_iter().skip(skip).collect();
        self.next_id = self
            .readings
            .iter()
            .map(|r| r.id)
            .max()
            .map_or(1, |max| max + 1);
    }

    /// every retained reading, oldest first (snapshot order)
    pub fn to_vec(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }
}

#[derive(Default)]
struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    fn summary(&self) -> Summary {
        let avg = if self.count == 0 { 0.0 } else { self.sum / self.count as f64 };
        Summary {
            min: self.min,
            max: self.max,
            avg: round2(avg),
        }
    }
}
