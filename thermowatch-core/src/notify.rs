//! Notification routing and rate limiting
//!
//! Alerts fan out to recipients through two capability lists modelled as a
//! bitmask: a recipient subscribed with mask `G` receives a message targeted
//! at mask `M` iff `G & M == G`, so a recipient can be scoped narrowly
//! ("system only") or broadly ("monitoring + system").
//!
//! Every recipient carries hourly and daily send quotas enforced over
//! sliding windows of send timestamps. An over-quota message is suppressed
//! and logged, never surfaced as an error: backpressure against notification
//! storms is the designed behavior here, not a fault.
//!
//! The router is shared by every monitor thread; the recipient table sits
//! behind one mutex so the prune/count/accept sequence stays atomic under
//! concurrent senders.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::time::{TimeSource, Timestamp, DAY_MS, HOUR_MS};

/// Distribution-list capability masks
pub mod lists {
    /// System-level alerts: sustained outages, power loss
    pub const SYSTEM: u8 = 1;
    /// Monitoring alerts: out-of-range readings
    pub const MONITORING: u8 = 2;
    /// Both lists
    pub const ALL: u8 = SYSTEM | MONITORING;
}

/// Failure reported by a notification transport
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The underlying delivery mechanism failed
    #[error("notification transport failure: {0}")]
    Transport(String),
}

/// Outbound delivery collaborator (SMS gateway or similar)
///
/// Invoked only after the rate limiter accepts a send.
pub trait NotificationTransport: Send + Sync {
    /// Deliver `body` to `address`
    fn send(&self, address: &str, body: &str) -> Result<(), NotifyError>;
}

/// Per-recipient send quotas over sliding windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct Quota {
    /// Maximum sends in any trailing hour
    pub per_hour: u32,
    /// Maximum sends in any trailing day
    pub per_day: u32,
}

impl Default for Quota {
    fn default() -> Self {
        Self { per_hour: 4, per_day: 20 }
    }
}

struct Recipient {
    address: String,
    subscribed: u8,
    quota: Quota,
    /// Send timestamps, pruned to the trailing day on every attempt
    sends: Vec<Timestamp>,
}

impl Recipient {
    /// Prune the window and accept the send if both quotas allow it
    fn try_accept(&mut self, now: Timestamp) -> bool {
        self.sends.retain(|&t| t + DAY_MS > now);
        let in_hour = self.sends.iter().filter(|&&t| t + HOUR_MS > now).count() as u32;
        let in_day = self.sends.len() as u32;

        if in_hour < self.quota.per_hour && in_day < self.quota.per_day {
            self.sends.push(now);
            log::info!(
                "sending to {} (hour {}/{}, day {}/{})",
                self.address, in_hour + 1, self.quota.per_hour, in_day + 1, self.quota.per_day
            );
            true
        } else {
            log::info!(
                "NOT sending to {} (hour {}/{}, day {}/{})",
                self.address, in_hour, self.quota.per_hour, in_day, self.quota.per_day
            );
            false
        }
    }
}

/// Routes alert messages to subscribed, under-quota recipients
pub struct AlertRouter {
    recipients: Mutex<Vec<Recipient>>,
    transport: Arc<dyn NotificationTransport>,
    clock: Arc<dyn TimeSource>,
}

impl AlertRouter {
    /// Create an empty router over a delivery transport
    pub fn new(transport: Arc<dyn NotificationTransport>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            recipients: Mutex::new(Vec::new()),
            transport,
            clock,
        }
    }

    /// Subscribe `address` to the lists in `subscribed` under `quota`
    pub fn add_recipient(&self, address: &str, subscribed: u8, quota: Quota) {
        let mut recipients = self.recipients.lock().unwrap_or_else(|e| e.into_inner());
        recipients.push(Recipient {
            address: address.to_owned(),
            subscribed,
            quota,
            sends: Vec::new(),
        });
    }

    /// Send `msg` to every recipient whose subscription is a subset of
    /// `target` and whose quotas allow it
    ///
    /// Transport failures are logged and never propagate: a dead gateway
    /// must not kill the monitoring thread that noticed a problem.
    pub fn alert(&self, target: u8, msg: &str) {
        let now = self.clock.now();
        let mut recipients = self.recipients.lock().unwrap_or_else(|e| e.into_inner());
        for r in recipients.iter_mut() {
            if r.subscribed & target != r.subscribed {
                continue;
            }
            if r.try_accept(now) {
                if let Err(e) = self.transport.send(&r.address, msg) {
                    log::error!("delivery to {} failed: {}", r.address, e);
                }
            }
        }
    }

    /// Fire a system-level alert
    pub fn alert_system(&self, msg: &str) {
        self.alert(lists::SYSTEM, msg);
    }

    /// Fire a monitoring alert
    pub fn alert_monitoring(&self, msg: &str) {
        self.alert(lists::MONITORING, msg);
    }

    /// Fire an alert to both lists
    pub fn alert_all(&self, msg: &str) {
        self.alert(lists::ALL, msg);
    }
}

/// In-memory transport that records deliveries, for tests and dry runs
#[derive(Default)]
pub struct MemoryTransport {
    deliveries: Mutex<Vec<(String, String)>>,
}

impl MemoryTransport {
    /// Create an empty recording transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries recorded so far as `(address, body)` pairs
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of deliveries recorded so far
    pub fn count(&self) -> usize {
        self.deliveries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl NotificationTransport for MemoryTransport {
    fn send(&self, address: &str, body: &str) -> Result<(), NotifyError> {
        let mut deliveries = self.deliveries.lock().unwrap_or_else(|e| e.into_inner());
        deliveries.push((address.to_owned(), body.to_owned()));
        Ok(())
    }
}
