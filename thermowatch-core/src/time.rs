//! Time abstraction for the monitoring engine
//!
//! Every time-sensitive policy in the engine (alarm grace periods, rate
//! limiter windows, debounce cooldowns) reads the clock through the
//! [`TimeSource`] trait so tests can drive it deterministically.
//!
//! Timestamps are milliseconds since the Unix epoch, UTC.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Milliseconds in one hour
pub const HOUR_MS: u64 = 60 * 60 * 1000;
/// Milliseconds in one day
pub const DAY_MS: u64 = 24 * HOUR_MS;

/// Source of time for the system
///
/// Implementations must be shareable across monitor threads.
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs test-driven)
    fn is_wall_clock(&self) -> bool;
}

/// System wall clock
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Settable clock for tests
///
/// Backed by an atomic so it can be advanced from the test thread while
/// monitor threads read it.
#[derive(Debug, Default)]
pub struct MockClock {
    now_ms: AtomicU64,
}

impl MockClock {
    /// Create a clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { now_ms: AtomicU64::new(timestamp) }
    }

    /// Jump to an absolute timestamp
    pub fn set(&self, timestamp: Timestamp) {
        self.now_ms.store(timestamp, Ordering::SeqCst);
    }

    /// Advance by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for MockClock {
    fn now(&self) -> Timestamp {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Render a timestamp as an ISO-8601 UTC instant, second precision
pub fn iso8601(ts: Timestamp) -> String {
    datetime(ts).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Convert a timestamp to a chrono UTC datetime
pub fn datetime(ts: Timestamp) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts as i64)
        .single()
        .unwrap_or_default()
}
