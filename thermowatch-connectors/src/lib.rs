//! Delivery Collaborators for Thermowatch
//!
//! ## Overview
//!
//! The monitoring engine talks to the outside world through three narrow
//! traits defined in `thermowatch-core`:
//!
//! - `MetricsSink` — one datapoint per successful sample
//! - `Publisher` — heartbeat records to a pub/sub topic
//! - `NotificationTransport` — alert bodies to a human, post rate limiting
//!
//! This crate provides HTTP-gateway implementations of all three. Each is a
//! thin client over one shared [`http::HttpClient`]; the engine never sees a
//! connection, a status code or a retry.
//!
//! ## Design Decisions
//!
//! We intentionally keep the clients simple and blocking:
//! - The engine already runs one thread per monitor; a slow push blocks only
//!   its own sensor's loop, which is the documented failure model.
//! - JSON everywhere; the gateways on the other end are plain REST services.
//! - Retries with exponential backoff happen inside the shared client, only
//!   for transport failures and retryable statuses (5xx, 429).
//!
//! ## Example Usage
//!
//! ```no_run
//! use thermowatch_connectors::http::{HttpClient, HttpConfig};
//! use thermowatch_connectors::metrics::HttpMetricsSink;
//!
//! # fn main() -> Result<(), thermowatch_connectors::http::HttpError> {
//! let client = HttpClient::new(
//!     HttpConfig::new("https://metrics.example.com").bearer_token("api-token"),
//! )?;
//! let sink = HttpMetricsSink::new(client);
//! // hand `sink` to a MetricsHeartbeat observer
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "pubsub")]
pub mod pubsub;

#[cfg(feature = "sms")]
pub mod sms;

/// Delivery statistics common to all connectors
#[derive(Debug, Default, Clone)]
pub struct DeliveryStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
}
