//! Calibrated sampling on top of the shared bus
//!
//! A sampling burst takes `count` raw reads through the bus serializer with a
//! fixed delay between attempts, decodes each frame, applies the sensor's
//! linear calibration to the probe temperature, and reduces to an arithmetic
//! mean. Faulted or failed reads are excluded from the mean, never
//! zero-filled; a burst where every read fails reports the first failure, or
//! an unknown fault when the observed fault kinds disagree.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::bus::{BusIo, SharedBus};
use crate::errors::{FaultKind, SensorError, SensorResult};
use crate::frame;
use crate::time::{self, TimeSource, Timestamp};

/// Per-sensor linear calibration, applied to the probe temperature as
/// `offset + gain * value`
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Calibration {
    /// Additive offset in °C
    pub offset: f64,
    /// Multiplicative gain
    pub gain: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { offset: 0.0, gain: 1.0 }
    }
}

impl Calibration {
    fn apply(&self, celsius: f64) -> f64 {
        self.offset + self.gain * celsius
    }
}

/// One reduced measurement, the unit of data handed to every observer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Sensor name
    pub name: String,
    /// UTC instant the burst completed
    #[serde(serialize_with = "serialize_iso8601")]
    pub timestamp: Timestamp,
    /// Mean calibrated probe temperature, °C
    pub celsius: f64,
    /// Derived from `celsius` as `c * 9/5 + 32`
    pub fahrenheit: f64,
    /// Mean raw reference-junction temperature, °C
    pub internal: f64,
    /// Bus channel the sensor is wired to
    pub channel: u8,
}

impl Sample {
    /// Build a sample, deriving the Fahrenheit field
    pub fn new(name: &str, timestamp: Timestamp, celsius: f64, internal: f64, channel: u8) -> Self {
        Self {
            name: name.to_owned(),
            timestamp,
            celsius,
            fahrenheit: celsius * 9.0 / 5.0 + 32.0,
            internal,
            channel,
        }
    }

    /// Timestamp as an ISO-8601 UTC string
    pub fn iso_timestamp(&self) -> String {
        time::iso8601(self.timestamp)
    }
}

fn serialize_iso8601<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time::iso8601(*ts))
}

/// Sampling unit for one shared bus
///
/// Cheap to clone; every sensor on the bus holds one.
pub struct Sampler<B: BusIo> {
    bus: Arc<SharedBus<B>>,
    clock: Arc<dyn TimeSource>,
}

impl<B: BusIo> Clone for Sampler<B> {
    fn clone(&self) -> Self {
        Self { bus: Arc::clone(&self.bus), clock: Arc::clone(&self.clock) }
    }
}

impl<B: BusIo> Sampler<B> {
    /// Create a sampler over `bus`
    pub fn new(bus: Arc<SharedBus<B>>, clock: Arc<dyn TimeSource>) -> Self {
        Self { bus, clock }
    }

    /// Take `count` reads from `channel` and reduce to one [`Sample`]
    ///
    /// `delay` elapses between successive read attempts, outside the bus
    /// lock, so other sensors can interleave their own reads into the burst.
    pub fn sample(
        &self,
        name: &str,
        channel: u8,
        count: u32,
        delay: Duration,
        calibration: Calibration,
    ) -> SensorResult<Sample> {
        let mut probes = Vec::with_capacity(count as usize);
        let mut references = Vec::with_capacity(count as usize);
        let mut first_failure: Option<SensorError> = None;
        let mut fault_kinds: Vec<FaultKind> = Vec::new();

        for i in 0..count {
            if i > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }
            match self.read_one(channel) {
                Ok(reading) => {
                    probes.push(calibration.apply(reading.probe_celsius));
                    references.push(reading.reference_celsius);
                }
                Err(err) => {
                    log::debug!("[{}] discarding read {}/{}: {}", name, i + 1, count, err);
                    if let SensorError::Fault(kind) = &err {
                        if !fault_kinds.contains(kind) {
                            fault_kinds.push(*kind);
                        }
                    }
                    first_failure.get_or_insert(err);
                }
            }
        }

        if probes.is_empty() {
            // Disagreeing fault reports usually mean bus contention rather
            // than a real wiring fault.
            return Err(if fault_kinds.len() > 1 {
                SensorError::Fault(FaultKind::Unknown)
            } else {
                first_failure.unwrap_or(SensorError::Fault(FaultKind::Unknown))
            });
        }

        Ok(Sample::new(
            name,
            self.clock.now(),
            mean(&probes),
            mean(&references),
            channel,
        ))
    }

    fn read_one(&self, channel: u8) -> SensorResult<frame::Reading> {
        let raw = self.bus.read_frame(channel)?;
        frame::decode(raw).map_err(SensorError::from)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
