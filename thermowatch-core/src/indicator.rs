//! Status indicator driving
//!
//! An [`Indicator`] is anything with an on/off state, typically a panel
//! LED. [`Blinker`] toggles one on the generic periodic scheduler instead of
//! a bespoke busy-loop thread, parameterized by separate on and off
//! durations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::scheduler::PeriodicTask;

/// A two-state status output
pub trait Indicator: Send {
    /// Drive the output on or off
    fn set(&mut self, on: bool);
}

/// Periodic on/off toggler for one indicator
pub struct Blinker {
    task: PeriodicTask,
    indicator: Arc<Mutex<dyn Indicator>>,
}

impl Blinker {
    /// Blink `indicator`: lit for `on`, dark for `off`, until stopped
    pub fn spawn(indicator: Arc<Mutex<dyn Indicator>>, on: Duration, off: Duration) -> Self {
        let driven = Arc::clone(&indicator);
        // Each cycle: light the indicator, hold for `on` (interruptibly),
        // douse it, then the task period provides the `off` hold.
        let task = PeriodicTask::spawn("blinker", off, move |ctl| {
            let mut led = driven.lock().unwrap_or_else(|e| e.into_inner());
            led.set(true);
            drop(led);
            ctl.wait(on);
            let mut led = driven.lock().unwrap_or_else(|e| e.into_inner());
            led.set(false);
        });

        Self { task, indicator }
    }

    /// Stop blinking, leaving the indicator off
    pub fn stop(self) {
        self.task.join();
        let mut led = self.indicator.lock().unwrap_or_else(|e| e.into_inner());
        led.set(false);
    }

    /// Stop blinking, leaving the indicator lit
    pub fn stop_on(self) {
        self.task.join();
        let mut led = self.indicator.lock().unwrap_or_else(|e| e.into_inner());
        led.set(true);
    }
}
