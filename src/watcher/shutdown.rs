//! Interruptible-wait shutdown flag.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// One-way stop flag with an interruptible wait.
///
/// The signal handler is the only writer; the watcher loop is the only
/// reader. `wait_timeout` returns the moment the flag is set, so a shutdown
/// request lands within the current sleep rather than after it.
#[derive(Default)]
pub struct ShutdownFlag {
    stopped: Mutex<bool>,
    signal: Condvar,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Called from the signal-handler thread.
    pub fn set(&self) {
        let mut stopped = self.stopped.lock().unwrap();
        *stopped = true;
        self.signal.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.stopped.lock().unwrap()
    }

    /// Sleep for up to `timeout`, waking early on [`set`](Self::set).
    /// Returns whether the flag is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let stopped = self.stopped.lock().unwrap();
        let (stopped, _) = self
            .signal
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap();
        *stopped
    }
}
