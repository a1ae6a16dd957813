//! Adaptation layer over the physical (non-reentrant) lock primitive.
//!
//! The recursive lock in [`crate::recursive`] blocks on exactly one physical
//! reader-writer lock, acquired on a thread's first logical acquisition and
//! released on its last. Acquisition and release happen in different method
//! calls, so the guard-based `parking_lot` types do not fit; this wrapper
//! exposes the raw lock instead, with release methods that are `unsafe`
//! under the usual `lock_api` contract (the lock must actually be held in
//! the matching mode when released).

use parking_lot::lock_api::RawRwLock as RawRwLockApi;

/// Non-reentrant physical reader-writer lock.
///
/// Multiple shared holders may coexist; an exclusive holder excludes all
/// others. Fairness between readers and writers is whatever `parking_lot`
/// provides.
pub(crate) struct RawRwLock {
    inner: parking_lot::RawRwLock,
}

impl RawRwLock {
    /// Creates the lock in the unlocked state.
    pub(crate) const fn new() -> Self {
        Self {
            inner: parking_lot::RawRwLock::INIT,
        }
    }

    /// Blocks until the lock is held in shared mode.
    pub(crate) fn read_lock(&self) {
        self.inner.lock_shared();
    }

    /// Attempts a shared acquisition without blocking.
    pub(crate) fn try_read_lock(&self) -> bool {
        self.inner.try_lock_shared()
    }

    /// Blocks until the lock is held in exclusive mode.
    pub(crate) fn write_lock(&self) {
        self.inner.lock_exclusive();
    }

    /// Attempts an exclusive acquisition without blocking.
    pub(crate) fn try_write_lock(&self) -> bool {
        self.inner.try_lock_exclusive()
    }

    /// Releases one shared acquisition.
    ///
    /// # Safety
    ///
    /// The lock must be held in shared mode.
    pub(crate) unsafe fn read_unlock(&self) {
        unsafe { self.inner.unlock_shared() }
    }

    /// Releases the exclusive acquisition.
    ///
    /// # Safety
    ///
    /// The lock must be held in exclusive mode.
    pub(crate) unsafe fn write_unlock(&self) {
        unsafe { self.inner.unlock_exclusive() }
    }

    /// Forces the lock back to the unlocked state, regardless of holders.
    ///
    /// The `&mut` receiver guarantees no thread can be blocked on or holding
    /// the lock while it is re-initialized.
    pub(crate) fn reset(&mut self) {
        self.inner = parking_lot::RawRwLock::INIT;
    }
}
