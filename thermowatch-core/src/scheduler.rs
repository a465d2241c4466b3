//! Generic periodic task primitive
//!
//! [`PeriodicTask`] runs a supplied action on its own thread at a fixed
//! period until cancelled. The inter-tick wait is a condition-variable wait,
//! so cancellation interrupts it immediately; a cancelled task never runs a
//! final extra invocation. The primitive knows nothing about sensors or
//! alarms and is reused for every monitor, blinker and watcher in the engine.
//!
//! Cancellation is cooperative: `stop()` flips the flag and wakes the waiter
//! but does not interrupt an action already in flight.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Shared {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

/// Handle given to the running action
///
/// Lets the action observe cancellation, stop its own task, and stretch the
/// current cycle with an interruptible wait.
#[derive(Clone)]
pub struct TaskControl {
    shared: Arc<Shared>,
}

impl TaskControl {
    /// Whether the task has been cancelled
    pub fn cancelled(&self) -> bool {
        *self.shared.cancelled.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel the task
    ///
    /// Idempotent and callable from any thread. Does not block waiting for
    /// an in-flight action; it only prevents the next tick.
    pub fn stop(&self) {
        let mut cancelled = self.shared.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        *cancelled = true;
        self.shared.signal.notify_all();
    }

    /// Wait up to `timeout`, returning early on cancellation
    ///
    /// Returns `true` when the task was cancelled during the wait.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut cancelled = self.shared.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        let deadline = std::time::Instant::now() + timeout;
        while !*cancelled {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _) = self
                .shared
                .signal
                .wait_timeout(cancelled, remaining)
                .unwrap_or_else(|e| e.into_inner());
            cancelled = guard;
        }
        true
    }
}

/// A cancellable repeating task
///
/// Invokes the action, then waits up to the period for a cancellation
/// signal; if signalled it stops immediately, otherwise it loops.
pub struct PeriodicTask {
    control: TaskControl,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn a named task running `action` every `period`
    pub fn spawn<F>(name: &str, period: Duration, mut action: F) -> Self
    where
        F: FnMut(&TaskControl) + Send + 'static,
    {
        let control = TaskControl {
            shared: Arc::new(Shared {
                cancelled: Mutex::new(false),
                signal: Condvar::new(),
            }),
        };

        let thread_control = control.clone();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || loop {
                if thread_control.cancelled() {
                    return;
                }
                action(&thread_control);
                if thread_control.wait(period) {
                    return;
                }
            })
            // Thread spawning only fails on resource exhaustion, at which
            // point the agent cannot run at all.
            .unwrap_or_else(|e| panic!("failed to spawn task thread: {e}"));

        Self { control, handle: Some(handle) }
    }

    /// Whether the task has not been cancelled
    pub fn active(&self) -> bool {
        !self.control.cancelled()
    }

    /// Cancel the task without waiting for the thread to exit
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Clone the control handle for external cancellation
    pub fn control(&self) -> TaskControl {
        self.control.clone()
    }

    /// Cancel and wait for the task thread to finish
    pub fn join(mut self) {
        self.control.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("periodic task panicked");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.control.stop();
    }
}
