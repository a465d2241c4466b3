//! Sensor capability
//!
//! [`Sensor`] is the seam between a monitor and the hardware: it can
//! produce a sample, and it can report that it has been permanently stopped.
//! The distinction matters for the monitor's failure handling, which retries
//! transient faults but halts quietly on a stopped sensor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::bus::BusIo;
use crate::config::SensorConfig;
use crate::errors::{SensorError, SensorResult};
use crate::sample::{Calibration, Sample, Sampler};

/// A sampleable sensor with an availability signal
pub trait Sensor: Send + Sync {
    /// Take one reduced measurement
    fn sample(&self) -> SensorResult<Sample>;

    /// Whether the sensor has been permanently stopped
    fn is_stopped(&self) -> bool;

    /// Sensor name
    fn name(&self) -> &str;
}

/// A thermocouple channel on the shared bus
pub struct ThermocoupleSensor<B: BusIo> {
    name: String,
    channel: u8,
    calibration: Calibration,
    sample_count: u32,
    sample_interval: Duration,
    sampler: Sampler<B>,
    stopped: AtomicBool,
}

impl<B: BusIo> ThermocoupleSensor<B> {
    /// Create a sensor from its configuration
    pub fn new(cfg: &SensorConfig, sampler: Sampler<B>) -> Arc<Self> {
        Arc::new(Self {
            name: cfg.name.clone(),
            channel: cfg.channel,
            calibration: cfg.calibration,
            sample_count: cfg.sample_count,
            sample_interval: cfg.sample_interval(),
            sampler,
            stopped: AtomicBool::new(false),
        })
    }

    /// Permanently stop the sensor
    ///
    /// Monitors bound to it will observe [`SensorError::Unavailable`] on
    /// their next tick and halt without alerting.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        log::debug!("[{}] stopped", self.name);
    }

    /// Bus channel this sensor reads
    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl<B: BusIo> Sensor for ThermocoupleSensor<B> {
    fn sample(&self) -> SensorResult<Sample> {
        if self.is_stopped() {
            return Err(SensorError::Unavailable { name: self.name.clone() });
        }
        self.sampler.sample(
            &self.name,
            self.channel,
            self.sample_count,
            self.sample_interval,
            self.calibration,
        )
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ScriptedBus, SharedBus};
    use crate::time::MockClock;

    fn sensor_with(io: ScriptedBus) -> Arc<ThermocoupleSensor<ScriptedBus>> {
        let cfg: SensorConfig = serde_json::from_str(
            r#"{"name": "TS-1", "channel": 0, "sample_count": 2, "sample_interval_ms": 0}"#,
        )
        .unwrap();
        let sampler = Sampler::new(
            Arc::new(SharedBus::new(io)),
            Arc::new(MockClock::new(0)),
        );
        ThermocoupleSensor::new(&cfg, sampler)
    }

    #[test]
    fn samples_through_the_bus() {
        let mut io = ScriptedBus::new(1);
        // 100 °C on both reads
        io.push_frames(0, 400 << 18, 2);
        let sensor = sensor_with(io);

        let s = sensor.sample().unwrap();
        assert_eq!(s.celsius, 100.0);
        assert_eq!(s.name, "TS-1");
    }

    #[test]
    fn stopped_sensor_is_unavailable() {
        let sensor = sensor_with(ScriptedBus::new(1));
        assert!(!sensor.is_stopped());

        sensor.stop();
        assert!(sensor.is_stopped());
        let err = sensor.sample().unwrap_err();
        assert!(err.is_permanent());
    }
}
