//! Per-sensor monitoring loop
//!
//! A [`SensorMonitor`] binds one sensor to one periodic task. Each tick
//! samples the sensor and hands the result to an observer. Failure handling
//! follows a fixed ladder:
//!
//! - success: dispatch to the observer, reset the consecutive-failure count;
//! - permanent unavailability (the sensor reports itself stopped): cancel
//!   the task quietly, no alert;
//! - any other failure: count it, and while under the limit stretch the
//!   current cycle by `period * failures` so retries thin out during a
//!   sustained outage; at the limit fire exactly one system-level alert with
//!   the root cause and halt permanently.
//!
//! A halted monitor never restarts itself; bringing it back is an operator
//! action. Decoder and bus failures never cross the monitor boundary as
//! panics, they only drive this state machine.

use std::sync::Arc;
use std::time::Duration;

use crate::config::SensorConfig;
use crate::notify::AlertRouter;
use crate::sample::Sample;
use crate::scheduler::PeriodicTask;
use crate::sensor::Sensor;

/// Consumer of the sample stream from one monitor
///
/// Observers are infallible by contract: anything that can go wrong inside
/// one (a full disk, a dead metrics endpoint) is its own to log. An observer
/// failure must never look like a sensor failure.
pub trait SampleObserver: Send {
    /// Consume one sample
    fn on_sample(&mut self, sample: &Sample);
}

/// Adapter turning a closure into an observer
pub struct ObserverFn<F>(pub F);

impl<F: FnMut(&Sample) + Send> SampleObserver for ObserverFn<F> {
    fn on_sample(&mut self, sample: &Sample) {
        (self.0)(sample)
    }
}

/// Monitor loop tunables
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// Tick period
    pub period: Duration,
    /// Consecutive failures tolerated before escalation
    pub max_failures: u32,
}

impl From<&SensorConfig> for MonitorConfig {
    fn from(cfg: &SensorConfig) -> Self {
        Self {
            period: cfg.monitor_period(),
            max_failures: cfg.max_failures,
        }
    }
}

/// A running per-sensor monitoring task
pub struct SensorMonitor {
    task: PeriodicTask,
    name: String,
}

impl SensorMonitor {
    /// Bind `sensor` to a new periodic task feeding `observer`
    pub fn spawn<O>(
        sensor: Arc<dyn Sensor>,
        mut observer: O,
        cfg: MonitorConfig,
        alerts: Arc<AlertRouter>,
    ) -> Self
    where
        O: SampleObserver + 'static,
    {
        let name = sensor.name().to_owned();
        let task_name = format!("monitor-{name}");
        let mut failures = 0u32;

        let task = PeriodicTask::spawn(&task_name, cfg.period, move |ctl| {
            match sensor.sample() {
                Ok(sample) => {
                    observer.on_sample(&sample);
                    failures = 0;
                }
                Err(err) if err.is_permanent() => {
                    log::info!("[{}] no longer available, ending monitor", sensor.name());
                    ctl.stop();
                }
                Err(err) => {
                    failures += 1;
                    let msg = format!(
                        "[{}] encountered unexpected failure: {}",
                        sensor.name(),
                        err
                    );
                    log::error!("{msg}");
                    if failures < cfg.max_failures {
                        log::info!(
                            "[{}] continuing (attempt {} of {})",
                            sensor.name(),
                            failures,
                            cfg.max_failures
                        );
                        // Linear backoff: stall this task's own timer, not
                        // the other monitors'. Interruptible by stop().
                        ctl.wait(cfg.period * failures);
                    } else {
                        alerts.alert_system(&format!(
                            "{msg} - maximum allowed failures exceeded ... ending!"
                        ));
                        ctl.stop();
                    }
                }
            }
        });

        Self { task, name }
    }

    /// Whether the monitor is still scheduled
    pub fn running(&self) -> bool {
        self.task.active()
    }

    /// Cancel the monitor
    pub fn stop(&self) {
        if self.running() {
            log::debug!("[{}] stopping monitor", self.name);
            self.task.stop();
        }
    }

    /// Cancel and wait for the monitor thread to exit
    pub fn join(self) {
        self.task.join();
    }
}
