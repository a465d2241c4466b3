//! Sensor monitoring and alerting engine for Thermowatch
//!
//! Polls thermocouple channels over a shared bit-serial bus, reduces raw
//! frames to calibrated samples, and drives one monitoring task per sensor
//! with failure backoff, range alarms with escalating grace periods, and
//! quota-limited human notification.
//!
//! Key constraints:
//! - One physical bus shared by all channels: frame reads are strictly
//!   serialized, everything else runs in parallel.
//! - Monitoring must survive transient hardware and network failures
//!   without crashing or spamming alerts.
//! - All escalation and suppression timing derives from explicit clocks
//!   and sample timestamps, so it is exactly reproducible in tests.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use thermowatch_core::{
//!     AlertRouter, MemoryTransport, MonitorConfig, RangeAlarm, SensorMonitor,
//!     Sampler, SharedBus, ScriptedBus, SystemClock, ThermocoupleSensor,
//! };
//!
//! let clock = Arc::new(SystemClock);
//! let bus = Arc::new(SharedBus::new(ScriptedBus::new(2)));
//! let sampler = Sampler::new(bus, clock.clone());
//!
//! let cfg: thermowatch_core::SensorConfig =
//!     serde_json::from_str(r#"{"name": "TS-1", "channel": 0}"#)?;
//! let sensor = ThermocoupleSensor::new(&cfg, sampler);
//!
//! let alerts = Arc::new(AlertRouter::new(Arc::new(MemoryTransport::new()), clock));
//! let alarm = RangeAlarm::new(
//!     thermowatch_core::AlarmConfig { min_c: 2.0, max_c: 8.0, base_grace_minutes: 2.0 },
//!     alerts.clone(),
//! );
//! let monitor = SensorMonitor::spawn(sensor, alarm, MonitorConfig::from(&cfg), alerts);
//! # monitor.stop();
//! # Ok::<(), serde_json::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod alarm;
pub mod bus;
pub mod config;
pub mod errors;
pub mod frame;
pub mod indicator;
pub mod monitor;
pub mod notify;
pub mod observers;
pub mod power;
pub mod sample;
pub mod scheduler;
pub mod sensor;
pub mod time;

// Public API
pub use alarm::RangeAlarm;
pub use bus::{BusIo, ScriptedBus, SharedBus};
pub use config::{AgentConfig, AlarmConfig, RecipientConfig, SensorConfig};
pub use errors::{BusError, FaultKind, SensorError, SensorResult};
pub use monitor::{MonitorConfig, ObserverFn, SampleObserver, SensorMonitor};
pub use notify::{AlertRouter, MemoryTransport, NotificationTransport, Quota};
pub use sample::{Calibration, Sample, Sampler};
pub use scheduler::{PeriodicTask, TaskControl};
pub use sensor::{Sensor, ThermocoupleSensor};
pub use time::{MockClock, SystemClock, TimeSource, Timestamp};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
