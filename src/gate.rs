//! One-shot gate for barrier-style signaling.
//!
//! A [`Gate`] is a set/clear flag with blocking waiters: threads block in
//! [`wait`](Gate::wait) (or [`wait_timeout`](Gate::wait_timeout)) until the
//! gate is set. Waiters return only while the gate is still set when they
//! actually resume, so a set immediately followed by a clear does not leak
//! through.
//!
//! This is the bounded-wait companion to the recursive lock: the blocking
//! lock path has no timeouts, so callers that need one wait on a gate (or
//! poll the try-variants) instead.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Binary-semaphore style gate. Starts in the "clear" state.
#[derive(Debug)]
pub struct Gate {
    set: Mutex<bool>,
    condvar: Condvar,
}

impl Gate {
    /// Creates the gate in the "clear" state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            set: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Moves the gate to the "set" state and wakes all waiters.
    pub fn set(&self) {
        let mut set = self.set.lock();
        *set = true;
        drop(set);
        self.condvar.notify_all();
    }

    /// Moves the gate to the "clear" state.
    pub fn clear(&self) {
        *self.set.lock() = false;
    }

    /// Returns true if the gate is currently set. Never blocks.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Blocks the calling thread until the gate is set. Returns immediately
    /// if it already is.
    pub fn wait(&self) {
        let mut set = self.set.lock();
        while !*set {
            self.condvar.wait(&mut set);
        }
    }

    /// Blocks until the gate is set or the timeout expires.
    ///
    /// Returns true if the gate was observed set, false on timeout.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.set.lock();
        while !*set {
            if self.condvar.wait_until(&mut set, deadline).timed_out() {
                return *set;
            }
        }
        true
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}
