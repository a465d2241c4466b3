//! Error taxonomy for the monitoring engine
//!
//! Failures fall into distinct classes, each with its own recovery policy:
//!
//! - [`FaultKind`]: the thermocouple amplifier reported a wiring fault in the
//!   frame itself. Recoverable; surfaces as a failed sample and feeds the
//!   monitor's backoff counter.
//! - [`BusError`]: the physical exchange failed (timeout, I/O). Also
//!   recoverable through the same backoff path.
//! - [`SensorError::Unavailable`]: the sensor has been explicitly stopped.
//!   Never retried; the owning monitor halts without alerting.
//!
//! Sustained-failure escalation (consecutive failures reaching the
//! configured maximum) and quota-based notification suppression are policy,
//! not error variants; they live in the monitor and notify modules.

use thiserror::Error;

/// Result type for sampling operations
pub type SensorResult<T> = Result<T, SensorError>;

/// Hardware fault classification decoded from a raw frame
///
/// When the frame's fault flag (bit 16) is set, exactly one of these is
/// reported, in priority order: open circuit, short to ground, short to VCC,
/// then unknown when the flag is set but no specific fault bit is.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Thermocouple is not connected (OC bit, D0)
    #[error("no connection")]
    OpenCircuit,
    /// Thermocouple shorted to ground (SCG bit, D1)
    #[error("thermocouple short to ground")]
    ShortToGround,
    /// Thermocouple shorted to VCC (SCV bit, D2)
    #[error("thermocouple short to VCC")]
    ShortToVcc,
    /// Fault flag set without a specific fault bit
    ///
    /// Usually another device driving the shared bus mid-exchange.
    #[error("unknown fault")]
    Unknown,
}

/// Failure of the physical frame exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The exchange did not complete
    #[error("bus exchange failed: {0}")]
    Exchange(&'static str),
    /// The requested channel is not wired on this bus
    #[error("no such channel: {0}")]
    BadChannel(u8),
}

/// Failure of a sampling attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// Every read in the sampling burst decoded to a hardware fault
    #[error("thermocouple fault: {0}")]
    Fault(#[from] FaultKind),

    /// Transient I/O failure on the shared bus
    #[error("bus failure: {0}")]
    Bus(#[from] BusError),

    /// The sensor has been permanently stopped
    #[error("sensor {name} is not available")]
    Unavailable {
        /// Name of the stopped sensor
        name: String,
    },
}

impl SensorError {
    /// Whether the monitor should halt quietly instead of retrying
    pub fn is_permanent(&self) -> bool {
        matches!(self, SensorError::Unavailable { .. })
    }
}
