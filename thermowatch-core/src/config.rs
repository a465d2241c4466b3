//! Immutable configuration surface
//!
//! All tunables are fixed at construction; nothing here is mutated at
//! runtime. The structs derive `Deserialize` so an outer bootstrap can load
//! them from a file, but the engine itself never reads configuration from
//! the environment. Defaults mirror a typical bench deployment: five reads
//! per burst at 100 ms spacing, a five-minute monitor period, four allowed
//! consecutive failures, a two-minute base grace period.

use std::time::Duration;

use serde::Deserialize;

use crate::notify::Quota;
use crate::sample::Calibration;

/// Top-level agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Agent name, used as a message prefix (usually the hostname)
    pub name: String,
    /// Monitored sensors
    pub sensors: Vec<SensorConfig>,
    /// Notification recipients
    #[serde(default)]
    pub recipients: Vec<RecipientConfig>,
}

/// Per-sensor wiring and sampling parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// Sensor name, unique per agent
    pub name: String,
    /// Bus channel the thermocouple is wired to
    pub channel: u8,
    /// Linear calibration for the probe temperature
    #[serde(default)]
    pub calibration: Calibration,
    /// Reads per sampling burst
    #[serde(default = "defaults::sample_count")]
    pub sample_count: u32,
    /// Delay between successive reads in a burst, milliseconds
    #[serde(default = "defaults::sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Monitor tick period, seconds
    #[serde(default = "defaults::monitor_period_secs")]
    pub monitor_period_secs: u64,
    /// Consecutive failures tolerated before escalation
    #[serde(default = "defaults::max_failures")]
    pub max_failures: u32,
    /// Range alarm, when configured
    #[serde(default)]
    pub alarm: Option<AlarmConfig>,
}

impl SensorConfig {
    /// Delay between reads in a burst
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Monitor tick period
    pub fn monitor_period(&self) -> Duration {
        Duration::from_secs(self.monitor_period_secs)
    }
}

/// Range alarm thresholds
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AlarmConfig {
    /// Lower bound, °C, inclusive
    pub min_c: f64,
    /// Upper bound, °C, inclusive
    pub max_c: f64,
    /// Minimum fault-episode duration before the first alert, minutes
    #[serde(default = "defaults::base_grace_minutes")]
    pub base_grace_minutes: f64,
}

/// One notification recipient
#[derive(Debug, Clone, Deserialize)]
pub struct RecipientConfig {
    /// Delivery address (phone number for the SMS gateway)
    pub address: String,
    /// Distribution-list mask, see [`crate::notify::lists`]
    #[serde(default = "defaults::subscribed")]
    pub subscribed: u8,
    /// Send quotas
    #[serde(default)]
    pub quota: Quota,
}

mod defaults {
    pub fn sample_count() -> u32 {
        5
    }
    pub fn sample_interval_ms() -> u64 {
        100
    }
    pub fn monitor_period_secs() -> u64 {
        300
    }
    pub fn max_failures() -> u32 {
        4
    }
    pub fn base_grace_minutes() -> f64 {
        2.0
    }
    pub fn subscribed() -> u8 {
        crate::notify::lists::MONITORING
    }
}
