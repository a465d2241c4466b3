//! Range alarm state machine
//!
//! Consumes the sample stream of one sensor and tracks fault episodes:
//! contiguous spans of out-of-range readings. An episode must outlast the
//! current grace period before the first alert fires; each alert then grows
//! the grace period (`grace += 1.1 * grace`) so an ongoing breach re-alerts
//! with exponentially increasing spacing instead of on every tick. The first
//! in-range reading ends the episode and resets everything.
//!
//! Bounds are inclusive: a reading exactly at the configured minimum or
//! maximum is in range.
//!
//! All episode timing derives from sample timestamps, so a replayed sample
//! stream reproduces the alarm's decisions exactly.

use std::sync::Arc;

use heapless::HistoryBuffer;

use crate::config::AlarmConfig;
use crate::monitor::SampleObserver;
use crate::notify::AlertRouter;
use crate::sample::Sample;
use crate::time::{self, Timestamp};

/// In-fault values retained for the episode mean; an episode longer than
/// this keeps the most recent window
const VALUE_WINDOW: usize = 256;

/// Range alarm for one sensor's sample stream
pub struct RangeAlarm {
    cfg: AlarmConfig,
    alerts: Arc<AlertRouter>,
    /// Start of the current fault episode; set iff the sensor is currently
    /// believed out of range
    fault_start: Option<Timestamp>,
    /// Out-of-range values of the current episode; cleared exactly when
    /// `fault_start` is cleared
    values: HistoryBuffer<f64, VALUE_WINDOW>,
    /// Minutes an episode must persist before the next alert; grows while
    /// in fault, resets to the configured base on recovery
    grace_minutes: f64,
}

impl RangeAlarm {
    /// Create an alarm with `cfg` routing alerts through `alerts`
    pub fn new(cfg: AlarmConfig, alerts: Arc<AlertRouter>) -> Self {
        Self {
            grace_minutes: cfg.base_grace_minutes,
            cfg,
            alerts,
            fault_start: None,
            values: HistoryBuffer::new(),
        }
    }

    /// Whether a fault episode is currently active
    pub fn in_fault(&self) -> bool {
        self.fault_start.is_some()
    }

    /// Duration of the current episode as of `sample`, in seconds
    fn episode_seconds(&self, sample: &Sample) -> f64 {
        match self.fault_start {
            Some(start) => sample.timestamp.saturating_sub(start) as f64 / 1000.0,
            None => 0.0,
        }
    }

    fn episode_mean(&self) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        self.values.oldest_ordered().copied().sum::<f64>() / n as f64
    }

    fn describe(&self, sample: &Sample) -> String {
        format!(
            "[{}] - Out of range. Reporting: {:.0}C at {}. \
             Ongoing out-of-range event duration: {:.1} minutes \
             (next alert: {:.1}), avg: {:.2}C, allowed range: ({}, {}).",
            sample.name,
            sample.celsius,
            time::iso8601(sample.timestamp),
            self.episode_seconds(sample) / 60.0,
            self.grace_minutes,
            self.episode_mean(),
            self.cfg.min_c,
            self.cfg.max_c,
        )
    }
}

impl SampleObserver for RangeAlarm {
    fn on_sample(&mut self, sample: &Sample) {
        let v = sample.celsius;
        if v < self.cfg.min_c || v > self.cfg.max_c {
            self.values.write(v);
            if self.fault_start.is_none() {
                self.fault_start = Some(sample.timestamp);
            }
            if self.episode_seconds(sample) > self.grace_minutes * 60.0 {
                // Widen the spacing of follow-up alerts for this episode
                // first, so the message advertises the grace now in force.
                self.grace_minutes += 1.1 * self.grace_minutes;
                self.alerts.alert_monitoring(&self.describe(sample));
            }
            log::info!("{}", self.describe(sample));
        } else if self.fault_start.is_some() {
            log::info!(
                "[{}] back in range at {:.2}C, episode over",
                sample.name,
                v
            );
            self.fault_start = None;
            self.values.clear();
            self.grace_minutes = self.cfg.base_grace_minutes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{lists, MemoryTransport, NotificationTransport, Quota};
    use crate::time::{MockClock, TimeSource};

    const MIN: u64 = 60_000;

    fn alarm(base_grace: f64) -> (Arc<MemoryTransport>, RangeAlarm) {
        let transport = Arc::new(MemoryTransport::new());
        let router = Arc::new(AlertRouter::new(
            Arc::clone(&transport) as Arc<dyn NotificationTransport>,
            Arc::new(MockClock::new(0)) as Arc<dyn TimeSource>,
        ));
        router.add_recipient(
            "+15550001111",
            lists::MONITORING,
            Quota { per_hour: 100, per_day: 100 },
        );
        let cfg = AlarmConfig { min_c: 2.0, max_c: 8.0, base_grace_minutes: base_grace };
        let alarm = RangeAlarm::new(cfg, router);
        (transport, alarm)
    }

    fn at(ts: Timestamp, celsius: f64) -> Sample {
        Sample::new("fridge", ts, celsius, 24.0, 0)
    }

    #[test]
    fn alert_fires_when_duration_exceeds_grace() {
        let (transport, mut alarm) = alarm(2.0);

        // Episode starts here; duration is measured from this sample.
        alarm.on_sample(&at(0, 12.0));
        assert!(alarm.in_fault());
        assert_eq!(transport.count(), 0);

        alarm.on_sample(&at(MIN, 12.5)); // 60 s: under grace
        alarm.on_sample(&at(2 * MIN, 13.0)); // 120 s: not strictly over
        assert_eq!(transport.count(), 0);

        alarm.on_sample(&at(3 * MIN, 13.5)); // 180 s > 120 s: first alert
        assert_eq!(transport.count(), 1);

        let body = &transport.deliveries()[0].1;
        assert!(body.contains("3.0 minutes"));
        assert!(body.contains("(2, 8)"));
        assert!(body.contains("avg: 12.75C"));
        // Grace doubled-and-a-bit: next alert advertised at 4.2 minutes.
        assert!(body.contains("next alert: 4.2"));
    }

    #[test]
    fn escalation_spaces_out_realerts() {
        let (transport, mut alarm) = alarm(2.0);

        // Breach every minute for eight minutes.
        for i in 0..9 {
            alarm.on_sample(&at(i * MIN, 20.0));
        }
        // Alert at 180 s (grace 120 s), then grace 4.2 min so the next at
        // 300 s (> 252 s), then grace 8.82 min: nine ticks see two alerts.
        assert_eq!(transport.count(), 2);
    }

    #[test]
    fn inclusive_bounds_clear_the_episode() {
        let (transport, mut alarm) = alarm(2.0);

        alarm.on_sample(&at(0, 9.0));
        assert!(alarm.in_fault());

        // Exactly at max_c: in range, episode over.
        alarm.on_sample(&at(MIN, 8.0));
        assert!(!alarm.in_fault());
        assert_eq!(transport.count(), 0);

        // Exactly at min_c never starts one.
        alarm.on_sample(&at(2 * MIN, 2.0));
        assert!(!alarm.in_fault());
    }

    #[test]
    fn recovery_resets_grace_and_buffer() {
        let (transport, mut alarm) = alarm(1.0);

        // Run an episode past its first alert so the grace has grown.
        alarm.on_sample(&at(0, 15.0));
        alarm.on_sample(&at(2 * MIN, 15.0));
        assert_eq!(transport.count(), 1);

        // Recover, then breach again: the fresh episode alerts on the base
        // grace, not the escalated one, and the mean only covers new values.
        alarm.on_sample(&at(3 * MIN, 5.0));
        alarm.on_sample(&at(4 * MIN, 30.0));
        alarm.on_sample(&at(6 * MIN, 30.0));
        assert_eq!(transport.count(), 2);
        assert!(transport.deliveries()[1].1.contains("avg: 30.00C"));
    }
}
