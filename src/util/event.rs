//! Manual-reset event used for the worker/revoker completion handshake.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A broadcast event that stays signaled until explicitly reset.
///
/// Every waiter blocked in [`wait_for`](Self::wait_for) is released while the
/// event is set; waiters arriving after [`reset`](Self::reset) block again.
#[derive(Debug, Default)]
pub struct ManualResetEvent {
    state: Mutex<bool>,
    cond: Condvar,
}

impl ManualResetEvent {
    /// Creates the event in the non-signaled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals the event, releasing all current and future waiters.
    pub fn set(&self) {
        let mut signaled = self.state.lock();
        *signaled = true;
        self.cond.notify_all();
    }

    /// Returns the event to the non-signaled state.
    pub fn reset(&self) {
        let mut signaled = self.state.lock();
        *signaled = false;
    }

    /// Blocks until the event is signaled or `timeout` expires.
    ///
    /// Returns `true` when the event was observed signaled. A `timeout` of
    /// [`Duration::MAX`] waits forever.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut signaled = self.state.lock();
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            // Past the representable range: wait forever.
            None => {
                while !*signaled {
                    self.cond.wait(&mut signaled);
                }
                return true;
            }
        };
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self.cond.wait_for(&mut signaled, deadline - now).timed_out() {
                return *signaled;
            }
        }
        true
    }
}
