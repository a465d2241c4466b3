//! Mains power supervision
//!
//! Polls a two-state power signal and feeds a small debounced state machine:
//! transitions that land inside the cooldown window after the previous one
//! are ignored (mechanical transfer switches chatter). A debounced loss
//! fires a system-level alert; a restore is logged. Side effects beyond
//! alerting (status LEDs and the like) are reached only through the
//! caller-supplied change callback, keeping them out of the state machine.

use std::sync::Arc;
use std::time::Duration;

use crate::notify::AlertRouter;
use crate::scheduler::PeriodicTask;
use crate::time::{TimeSource, Timestamp};

/// Source of the mains-power state
pub trait PowerSignal: Send + Sync {
    /// Whether mains power is currently present
    fn has_power(&self) -> bool;
}

/// Debounced power transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// Power observed present (including at first observation)
    Restored,
    /// Power observed absent (including at first observation)
    Lost,
}

/// Debounce state machine, pure of I/O
///
/// The first observation always reports, establishing the baseline; after
/// that, only state changes outside the cooldown window report.
pub struct PowerStateMachine {
    cooldown: Duration,
    state: Option<bool>,
    last_change: Timestamp,
}

impl PowerStateMachine {
    /// Create a machine ignoring transitions within `cooldown` of the last
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            state: None,
            last_change: 0,
        }
    }

    /// Feed one observation, returning the event to report if any
    pub fn observe(&mut self, has_power: bool, now: Timestamp) -> Option<PowerEvent> {
        match self.state {
            Some(prev) if prev == has_power => None,
            Some(_) if now.saturating_sub(self.last_change) < self.cooldown.as_millis() as u64 => {
                log::debug!("ignoring power transition inside cooldown window");
                None
            }
            _ => {
                self.state = Some(has_power);
                self.last_change = now;
                Some(if has_power { PowerEvent::Restored } else { PowerEvent::Lost })
            }
        }
    }
}

/// Periodic power supervisor
pub struct PowerWatcher {
    task: PeriodicTask,
}

impl PowerWatcher {
    /// Poll `signal` every `poll_interval`, alerting on debounced loss
    ///
    /// `on_change` runs on every reported transition with the new state.
    pub fn spawn<F>(
        name: &str,
        signal: Arc<dyn PowerSignal>,
        poll_interval: Duration,
        cooldown: Duration,
        clock: Arc<dyn TimeSource>,
        alerts: Arc<AlertRouter>,
        mut on_change: F,
    ) -> Self
    where
        F: FnMut(bool) + Send + 'static,
    {
        let name = name.to_owned();
        let mut machine = PowerStateMachine::new(cooldown);

        let task = PeriodicTask::spawn(&format!("power-{name}"), poll_interval, move |_| {
            match machine.observe(signal.has_power(), clock.now()) {
                Some(PowerEvent::Restored) => {
                    log::info!("[{name}] - Has power.");
                    on_change(true);
                }
                Some(PowerEvent::Lost) => {
                    let msg = format!("[{name}] - Has lost power.");
                    log::info!("{msg}");
                    alerts.alert_system(&msg);
                    on_change(false);
                }
                None => {}
            }
        });

        Self { task }
    }

    /// Whether the watcher is still scheduled
    pub fn running(&self) -> bool {
        self.task.active()
    }

    /// Cancel and wait for the watcher to exit
    pub fn join(self) {
        self.task.join();
    }
}
