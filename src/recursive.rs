//! Reentrant reader-writer lock with pause/resume and lock-order checking.
//!
//! [`ReentrantRwLock`] lets a single thread acquire the same lock many times
//! (in read mode, write mode, or a writer nesting reads on top) while other
//! threads see one physical reader-writer lock underneath. The physical lock
//! is touched only when a thread's combined nesting depth transitions from
//! zero to one or back; everything in between is bookkeeping under a short
//! mutex-protected critical section.
//!
//! # Reentrancy rules
//!
//! - A thread may always begin or extend a read acquisition. A writer
//!   implicitly has read access, so nesting reads under a write is fine.
//! - A thread may begin a new write acquisition only if it is already the
//!   writer or holds no read acquisitions of its own. Upgrading from read
//!   to write would deadlock the thread against itself and is rejected as a
//!   contract violation.
//!
//! # Pause/Resume
//!
//! [`pause`](ReentrantRwLock::pause) saves the calling thread's entire
//! nesting state and releases the lock, so the thread can block elsewhere
//! without being seen as a holder. [`resume`](ReentrantRwLock::resume)
//! reacquires the physical lock exactly once (write mode takes precedence,
//! since only a write may sit outermost) and restores the saved depths.
//!
//! # Lock ordering
//!
//! [`set_dependent_lock`](ReentrantRwLock::set_dependent_lock) declares that
//! this lock must not be newly acquired by a thread already holding the
//! dependency. Violations are caught by debug assertions and compile out in
//! release builds; the check is a development-time net, not a production
//! guarantee.
//!
//! # Contract violations
//!
//! Illegal call sequences (write-after-own-read, operating while paused,
//! strict unlock with nothing held, ordering violations) indicate caller
//! bugs. They fail fast via `debug_assert!` in debug builds; in release
//! builds the checks are elided and the bookkeeping that follows is
//! undefined (typically a self-deadlock or depth corruption).
//!
//! # Example
//!
//! ```
//! use relock::ReentrantRwLock;
//!
//! let lock = ReentrantRwLock::new();
//! lock.write_lock();
//! lock.read_lock(); // a writer may nest read acquisitions
//! assert!(lock.is_locked_by_current_thread());
//! lock.unlock();
//! lock.unlock();
//! assert!(!lock.is_locked_by_current_thread());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::raw::RawRwLock;

#[cfg(feature = "lock-metrics")]
use crate::metrics::Counters;
use crate::metrics::LockMetricsSnapshot;

/// Saved nesting depths of one paused thread.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    read_depth: u32,
    write_depth: u32,
}

/// Bookkeeping behind the lock's mutex.
///
/// `read_depth` entries are removed (never left at zero) when a thread's
/// count drains. `writer` is set exactly while `write_depth > 0`.
#[derive(Debug, Default, Clone)]
struct State {
    writer: Option<ThreadId>,
    write_depth: u32,
    read_depth: HashMap<ThreadId, u32>,
    snapshots: HashMap<ThreadId, Snapshot>,
    dependency: Option<Weak<ReentrantRwLock>>,
}

/// Reentrant reader-writer lock for preemptible OS threads.
///
/// See the [module docs](self) for the reentrancy rules, the pause/resume
/// protocol, and the failure model. Construction yields an unlocked
/// instance; [`reset`](Self::reset) forces one back to that state.
pub struct ReentrantRwLock {
    /// Physical lock; acquired on 0->1 depth transitions, released on 1->0.
    phys: RawRwLock,
    /// Bookkeeping mutex. Never held across a blocking physical acquisition.
    state: Mutex<State>,
    /// True iff `state.snapshots` is non-empty. Lets the paused-state check
    /// skip the mutex when nothing on this instance is paused.
    any_paused: AtomicBool,
    #[cfg(feature = "lock-metrics")]
    counters: Counters,
}

impl ReentrantRwLock {
    /// Creates the lock in the unlocked state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phys: RawRwLock::new(),
            state: Mutex::new(State::default()),
            any_paused: AtomicBool::new(false),
            #[cfg(feature = "lock-metrics")]
            counters: Counters::default(),
        }
    }

    /// Declares that this lock depends on `dependency`: a thread that holds
    /// `dependency` must not newly acquire this lock.
    ///
    /// The reference is non-owning; `dependency` must outlive this lock.
    /// Expected to be called once, before concurrent use begins.
    pub fn set_dependent_lock(&self, dependency: &Arc<Self>) {
        self.state.lock().dependency = Some(Arc::downgrade(dependency));
        tracing::debug!("lock dependency declared");
    }

    /// Forces the lock back to its initial, unlocked state.
    ///
    /// Drops all bookkeeping, paused snapshots, the declared dependency, and
    /// the physical lock's state. Intended for recovery after abnormal
    /// termination of a holder; the `&mut` receiver guarantees no concurrent
    /// use during the reset.
    pub fn reset(&mut self) {
        let state = self.state.get_mut();
        state.writer = None;
        state.write_depth = 0;
        state.read_depth.clear();
        state.snapshots.clear();
        state.dependency = None;
        *self.any_paused.get_mut() = false;
        self.phys.reset();
        tracing::debug!("reentrant rwlock reset to initial state");
    }

    /// Acquires the lock for read access, blocking if another thread holds
    /// it for write. Always succeeds for the calling thread: reads nest
    /// under the thread's own reads and under its own write ownership.
    pub fn read_lock(&self) {
        let tid = thread::current().id();
        debug_assert!(!self.is_paused(tid), "lock operation while paused on this lock");
        debug_assert!(
            self.chain_is_legal(tid),
            "acquisition order violates the declared lock dependency"
        );
        self.read_lock_inner(tid);
    }

    /// Acquires the lock for exclusive write access, blocking until all
    /// other holders release.
    ///
    /// Legal only if the calling thread is already the writer or holds no
    /// read acquisitions of its own; violating that is a contract violation
    /// (debug assertion; self-deadlock in release builds).
    pub fn write_lock(&self) {
        let tid = thread::current().id();
        debug_assert!(!self.is_paused(tid), "lock operation while paused on this lock");
        debug_assert!(
            self.chain_is_legal(tid),
            "acquisition order violates the declared lock dependency"
        );
        self.write_lock_inner(tid);
    }

    /// Releases exactly one logical acquisition of the calling thread,
    /// read acquisitions first. The physical lock is released only when the
    /// thread's combined depth returns to zero.
    ///
    /// Calling this while holding nothing is a contract violation; use
    /// [`unlock_if_locked`](Self::unlock_if_locked) to tolerate that.
    pub fn unlock(&self) {
        let tid = thread::current().id();
        debug_assert!(!self.is_paused(tid), "lock operation while paused on this lock");
        debug_assert!(
            self.chain_is_legal(tid),
            "acquisition order violates the declared lock dependency"
        );
        self.unlock_inner(tid, true);
    }

    /// Like [`unlock`](Self::unlock), but a no-op when the calling thread
    /// holds nothing.
    pub fn unlock_if_locked(&self) {
        let tid = thread::current().id();
        debug_assert!(!self.is_paused(tid), "lock operation while paused on this lock");
        debug_assert!(
            self.chain_is_legal(tid),
            "acquisition order violates the declared lock dependency"
        );
        self.unlock_inner(tid, false);
    }

    /// Attempts read acquisition without blocking.
    ///
    /// Only the first physical acquisition can fail; nested acquisitions
    /// always succeed. On failure nothing is mutated.
    #[must_use]
    pub fn try_read_lock(&self) -> bool {
        let tid = thread::current().id();
        debug_assert!(!self.is_paused(tid), "lock operation while paused on this lock");
        debug_assert!(
            self.chain_is_legal(tid),
            "acquisition order violates the declared lock dependency"
        );
        if self.recursion_level(tid) == 0 && !self.phys_try_read_lock() {
            return false;
        }
        self.register_read(tid);
        #[cfg(feature = "lock-metrics")]
        self.counters.record_read();
        true
    }

    /// Attempts write acquisition without blocking. Same legality rules as
    /// [`write_lock`](Self::write_lock); on failure nothing is mutated.
    #[must_use]
    pub fn try_write_lock(&self) -> bool {
        let tid = thread::current().id();
        debug_assert!(!self.is_paused(tid), "lock operation while paused on this lock");
        debug_assert!(
            self.chain_is_legal(tid),
            "acquisition order violates the declared lock dependency"
        );
        let level = self.write_level(tid);
        debug_assert!(
            level.is_some(),
            "write_lock requires no outstanding read locks on this thread"
        );
        if level.unwrap_or(0) == 0 && !self.phys_try_write_lock() {
            return false;
        }
        self.register_write(tid);
        #[cfg(feature = "lock-metrics")]
        self.counters.record_write();
        true
    }

    /// Saves the calling thread's entire nesting state and releases the
    /// lock, so the thread can block elsewhere without holding it.
    ///
    /// A no-op if the thread holds nothing. Pausing twice without an
    /// intervening [`resume`](Self::resume) is a contract violation.
    pub fn pause(&self) {
        let tid = thread::current().id();
        debug_assert!(!self.is_paused(tid), "pause while already paused on this lock");
        debug_assert!(
            self.chain_is_legal(tid),
            "acquisition order violates the declared lock dependency"
        );
        self.pause_inner(tid);
    }

    /// Restores the nesting state saved by [`pause`](Self::pause),
    /// reacquiring the physical lock exactly once. Write mode takes
    /// precedence when the saved state had both write and read depth, since
    /// only a write acquisition may sit outermost.
    ///
    /// A no-op if the calling thread has no saved snapshot.
    pub fn resume(&self) {
        let tid = thread::current().id();
        debug_assert!(
            self.chain_is_legal(tid),
            "acquisition order violates the declared lock dependency"
        );
        self.resume_inner(tid);
    }

    /// Returns true iff the calling thread holds at least one read or write
    /// acquisition.
    #[must_use]
    pub fn is_locked_by_current_thread(&self) -> bool {
        self.is_locked(thread::current().id())
    }

    /// Acquires read access and returns a guard that releases it on drop.
    ///
    /// The guard must be dropped on the acquiring thread.
    #[must_use = "the guard releases the lock when dropped"]
    pub fn read(&self) -> ReadGuard<'_> {
        self.read_lock();
        ReadGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Acquires write access and returns a guard that releases it on drop.
    ///
    /// The guard must be dropped on the acquiring thread.
    #[must_use = "the guard releases the lock when dropped"]
    pub fn write(&self) -> WriteGuard<'_> {
        self.write_lock();
        WriteGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Returns the current metrics snapshot.
    ///
    /// Empty unless the `lock-metrics` feature is enabled.
    #[must_use]
    pub fn metrics_snapshot(&self) -> LockMetricsSnapshot {
        #[cfg(feature = "lock-metrics")]
        {
            self.counters.snapshot()
        }
        #[cfg(not(feature = "lock-metrics"))]
        {
            LockMetricsSnapshot::default()
        }
    }

    /// Resets all metrics counters to zero. No-op when `lock-metrics` is
    /// disabled.
    pub fn reset_metrics(&self) {
        #[cfg(feature = "lock-metrics")]
        self.counters.reset();
    }

    // ── Recursion accounting ──────────────────────────────────────────────

    fn read_lock_inner(&self, tid: ThreadId) {
        if self.recursion_level(tid) == 0 {
            // First acquisition pays the physical cost. The bookkeeping
            // mutex is not held here; blocking happens only on the physical
            // primitive.
            self.phys_read_lock();
        }
        self.register_read(tid);
        #[cfg(feature = "lock-metrics")]
        self.counters.record_read();
    }

    fn write_lock_inner(&self, tid: ThreadId) {
        let level = self.write_level(tid);
        debug_assert!(
            level.is_some(),
            "write_lock requires no outstanding read locks on this thread"
        );
        if level.unwrap_or(0) == 0 {
            self.phys_write_lock();
        }
        self.register_write(tid);
        #[cfg(feature = "lock-metrics")]
        self.counters.record_write();
    }

    fn unlock_inner(&self, tid: ThreadId, strict: bool) {
        // Read acquisitions are released first: a write, when present, is
        // always the outermost layer for its thread, so draining reads first
        // never causes a premature physical release.
        let mut from_write = false;
        let remaining = match self.unregister_read(tid) {
            Some(0) => self.write_depth_of(tid),
            Some(remaining) => remaining,
            None => match self.unregister_write(tid) {
                Some(remaining) => {
                    from_write = true;
                    remaining
                }
                None => {
                    debug_assert!(
                        !strict,
                        "unlock called but the current thread holds no acquisition"
                    );
                    return;
                }
            },
        };
        if remaining > 0 {
            return;
        }
        if from_write {
            // SAFETY: the final unit released was a write unit, so this
            // thread's first acquisition took the physical lock in exclusive
            // mode (a writer cannot start under its own reads, and reads
            // drain before the last write unit) and it is still held.
            unsafe { self.phys.write_unlock() }
        } else {
            // SAFETY: the thread held read acquisitions only, so its first
            // acquisition took the physical lock in shared mode and that
            // shared hold is still outstanding.
            unsafe { self.phys.read_unlock() }
        }
    }

    /// Combined read + write nesting depth of `tid`. Taking a read lock is
    /// always legal, so this doubles as the read-acquisition precondition.
    fn recursion_level(&self, tid: ThreadId) -> u32 {
        let state = self.state.lock();
        let mut level = state.read_depth.get(&tid).copied().unwrap_or(0);
        if state.writer == Some(tid) {
            level += state.write_depth;
        }
        level
    }

    /// Combined depth if a write acquisition is legal for `tid`, `None` if
    /// the thread holds reads without write ownership.
    fn write_level(&self, tid: ThreadId) -> Option<u32> {
        let state = self.state.lock();
        let reads = state.read_depth.get(&tid).copied().unwrap_or(0);
        if state.writer != Some(tid) && reads > 0 {
            return None;
        }
        let mut level = reads;
        if state.writer == Some(tid) {
            level += state.write_depth;
        }
        Some(level)
    }

    fn register_read(&self, tid: ThreadId) {
        let mut state = self.state.lock();
        *state.read_depth.entry(tid).or_insert(0) += 1;
    }

    /// Removes one read unit. Returns the remaining read depth, or `None`
    /// if `tid` held no read acquisition.
    fn unregister_read(&self, tid: ThreadId) -> Option<u32> {
        let mut state = self.state.lock();
        let depth = state.read_depth.get_mut(&tid)?;
        *depth -= 1;
        let remaining = *depth;
        if remaining == 0 {
            state.read_depth.remove(&tid);
        }
        Some(remaining)
    }

    fn register_write(&self, tid: ThreadId) {
        let mut state = self.state.lock();
        state.writer = Some(tid);
        state.write_depth += 1;
    }

    /// Removes one write unit. Returns the remaining write depth, or `None`
    /// if `tid` is not the writer.
    fn unregister_write(&self, tid: ThreadId) -> Option<u32> {
        let mut state = self.state.lock();
        if state.writer != Some(tid) {
            return None;
        }
        state.write_depth -= 1;
        let remaining = state.write_depth;
        if remaining == 0 {
            state.writer = None;
        }
        Some(remaining)
    }

    fn write_depth_of(&self, tid: ThreadId) -> u32 {
        let state = self.state.lock();
        if state.writer == Some(tid) {
            state.write_depth
        } else {
            0
        }
    }

    fn is_locked(&self, tid: ThreadId) -> bool {
        let state = self.state.lock();
        state.writer == Some(tid) || state.read_depth.contains_key(&tid)
    }

    // ── Pause/Resume ──────────────────────────────────────────────────────

    fn pause_inner(&self, tid: ThreadId) {
        {
            let mut state = self.state.lock();
            let read_depth = state.read_depth.get(&tid).copied().unwrap_or(0);
            let write_depth = if state.writer == Some(tid) {
                state.write_depth
            } else {
                0
            };
            if read_depth == 0 && write_depth == 0 {
                return;
            }
            let prior = state.snapshots.insert(
                tid,
                Snapshot {
                    read_depth,
                    write_depth,
                },
            );
            debug_assert!(prior.is_none(), "pause without a matching resume");
            self.any_paused.store(true, Ordering::Release);
            // Collapse the thread's bookkeeping to one nominal unit so the
            // full unlock below walks the ordinary release path exactly
            // once. Write-ness wins because it is the outermost layer.
            if write_depth >= 1 {
                state.write_depth = 1;
                state.read_depth.remove(&tid);
            } else {
                state.read_depth.insert(tid, 1);
            }
            tracing::trace!(?tid, read_depth, write_depth, "lock state paused");
        }
        self.unlock_inner(tid, true);
        #[cfg(feature = "lock-metrics")]
        self.counters.record_pause();
    }

    fn resume_inner(&self, tid: ThreadId) {
        let snapshot = {
            let mut state = self.state.lock();
            let snapshot = state.snapshots.remove(&tid);
            if snapshot.is_some() {
                self.any_paused
                    .store(!state.snapshots.is_empty(), Ordering::Release);
            }
            snapshot
        };
        let Some(Snapshot {
            mut read_depth,
            mut write_depth,
        }) = snapshot
        else {
            return;
        };
        tracing::trace!(?tid, read_depth, write_depth, "lock state resuming");

        // One physical reacquisition, write mode first: only a write may
        // legally sit outermost, and the saved state already proved itself
        // legal before the pause.
        if write_depth > 0 {
            self.write_lock_inner(tid);
            write_depth -= 1;
        } else if read_depth > 0 {
            self.read_lock_inner(tid);
            read_depth -= 1;
        }

        // The physical lock is now held in the correct mode; the rest is
        // pure bookkeeping.
        for _ in 0..write_depth {
            self.register_write(tid);
        }
        for _ in 0..read_depth {
            self.register_read(tid);
        }
        #[cfg(feature = "lock-metrics")]
        self.counters.record_resume();
    }

    fn is_paused(&self, tid: ThreadId) -> bool {
        // Fast path: the flag is set before any snapshot is stored and
        // cleared after the last one is removed, so false here means no
        // thread on this instance is paused.
        if !self.any_paused.load(Ordering::Acquire) {
            return false;
        }
        self.state.lock().snapshots.contains_key(&tid)
    }

    // ── Dependency enforcement ────────────────────────────────────────────

    /// A new acquisition is legal when no dependency is declared, when the
    /// thread already holds this lock (no new physical wait can occur), or
    /// when the thread does not hold the dependency.
    fn chain_is_legal(&self, tid: ThreadId) -> bool {
        let dependency = self.state.lock().dependency.clone();
        let Some(dependency) = dependency else {
            return true;
        };
        if self.is_locked(tid) {
            return true;
        }
        match dependency.upgrade() {
            Some(dependency) => !dependency.is_locked(tid),
            // Dependency dropped early; a documented precondition violation
            // that degrades to "no dependency declared".
            None => true,
        }
    }

    // ── Physical lock, with contention accounting ─────────────────────────

    fn phys_read_lock(&self) {
        #[cfg(feature = "lock-metrics")]
        {
            if self.phys.try_read_lock() {
                return;
            }
            self.counters.record_contention();
        }
        self.phys.read_lock();
    }

    fn phys_write_lock(&self) {
        #[cfg(feature = "lock-metrics")]
        {
            if self.phys.try_write_lock() {
                return;
            }
            self.counters.record_contention();
        }
        self.phys.write_lock();
    }

    fn phys_try_read_lock(&self) -> bool {
        let acquired = self.phys.try_read_lock();
        #[cfg(feature = "lock-metrics")]
        if !acquired {
            self.counters.record_contention();
        }
        acquired
    }

    fn phys_try_write_lock(&self) -> bool {
        let acquired = self.phys.try_write_lock();
        #[cfg(feature = "lock-metrics")]
        if !acquired {
            self.counters.record_contention();
        }
        acquired
    }

    #[cfg(test)]
    fn debug_state(&self) -> State {
        self.state.lock().clone()
    }
}

impl Default for ReentrantRwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReentrantRwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrantRwLock")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Guard releasing a read acquisition on drop.
///
/// Not `Send`: the release must run on the thread that acquired, because
/// the bookkeeping is keyed by thread identity.
#[must_use = "the guard releases the lock when dropped"]
pub struct ReadGuard<'a> {
    lock: &'a ReentrantRwLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

impl fmt::Debug for ReadGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadGuard").finish_non_exhaustive()
    }
}

/// Guard releasing a write acquisition on drop.
///
/// Not `Send`, for the same reason as [`ReadGuard`].
#[must_use = "the guard releases the lock when dropped"]
pub struct WriteGuard<'a> {
    lock: &'a ReentrantRwLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

impl fmt::Debug for WriteGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::significant_drop_tightening)]
mod tests {
    use super::*;
    use crate::test_logging::init_test_logging;
    use std::sync::mpsc;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn read_lock_is_reentrant() {
        init_test("read_lock_is_reentrant");
        let lock = ReentrantRwLock::new();

        lock.read_lock();
        lock.read_lock();
        lock.read_lock();
        crate::assert_with_log!(
            lock.is_locked_by_current_thread(),
            "locked at depth 3",
            true,
            lock.is_locked_by_current_thread()
        );

        lock.unlock();
        lock.unlock();
        crate::assert_with_log!(
            lock.is_locked_by_current_thread(),
            "still locked at depth 1",
            true,
            lock.is_locked_by_current_thread()
        );
        lock.unlock();
        crate::assert_with_log!(
            !lock.is_locked_by_current_thread(),
            "unlocked after matched releases",
            false,
            lock.is_locked_by_current_thread()
        );
        crate::test_complete!("read_lock_is_reentrant");
    }

    #[test]
    fn write_lock_is_reentrant() {
        init_test("write_lock_is_reentrant");
        let lock = ReentrantRwLock::new();

        lock.write_lock();
        lock.write_lock();
        lock.unlock();
        crate::assert_with_log!(
            lock.is_locked_by_current_thread(),
            "locked after one of two unlocks",
            true,
            lock.is_locked_by_current_thread()
        );
        lock.unlock();
        crate::assert_with_log!(
            !lock.is_locked_by_current_thread(),
            "unlocked",
            false,
            lock.is_locked_by_current_thread()
        );
        crate::test_complete!("write_lock_is_reentrant");
    }

    #[test]
    fn writer_nests_reads_on_top() {
        init_test("writer_nests_reads_on_top");
        let lock = ReentrantRwLock::new();

        lock.write_lock();
        lock.read_lock();
        lock.read_lock();

        let state = lock.debug_state();
        assert_eq!(state.write_depth, 1);
        assert_eq!(state.read_depth.len(), 1);

        lock.unlock();
        lock.unlock();
        lock.unlock();
        crate::assert_with_log!(
            !lock.is_locked_by_current_thread(),
            "fully released",
            false,
            lock.is_locked_by_current_thread()
        );
        crate::test_complete!("writer_nests_reads_on_top");
    }

    #[test]
    fn unlock_prefers_the_read_counter() {
        init_test("unlock_prefers_the_read_counter");
        let lock = ReentrantRwLock::new();

        lock.write_lock();
        lock.write_lock();
        lock.read_lock();

        // First unlock drains the read unit, not a write unit.
        lock.unlock();
        let state = lock.debug_state();
        assert_eq!(state.write_depth, 2);
        assert!(state.read_depth.is_empty());

        lock.unlock();
        lock.unlock();
        let state = lock.debug_state();
        assert_eq!(state.write_depth, 0);
        assert_eq!(state.writer, None);
        crate::test_complete!("unlock_prefers_the_read_counter");
    }

    #[test]
    fn unlock_interleaves_reads_and_writes() {
        init_test("unlock_interleaves_reads_and_writes");
        let lock = ReentrantRwLock::new();

        // Non-stack acquisition order: the counters are commutative bags,
        // and a writer may keep nesting writes after reads.
        lock.write_lock();
        lock.read_lock();
        lock.write_lock();

        let state = lock.debug_state();
        assert_eq!(state.write_depth, 2);
        assert_eq!(state.read_depth.get(&thread::current().id()), Some(&1));

        lock.unlock();
        lock.unlock();
        crate::assert_with_log!(
            lock.is_locked_by_current_thread(),
            "still locked after two of three unlocks",
            true,
            lock.is_locked_by_current_thread()
        );
        lock.unlock();
        crate::assert_with_log!(
            !lock.is_locked_by_current_thread(),
            "released after exactly three unlocks",
            false,
            lock.is_locked_by_current_thread()
        );
        crate::test_complete!("unlock_interleaves_reads_and_writes");
    }

    #[test]
    fn unlock_if_locked_tolerates_nothing_held() {
        init_test("unlock_if_locked_tolerates_nothing_held");
        let lock = ReentrantRwLock::new();
        lock.unlock_if_locked();

        lock.read_lock();
        lock.unlock_if_locked();
        crate::assert_with_log!(
            !lock.is_locked_by_current_thread(),
            "released the one read",
            false,
            lock.is_locked_by_current_thread()
        );
        crate::test_complete!("unlock_if_locked_tolerates_nothing_held");
    }

    #[test]
    fn try_variants_succeed_when_uncontended() {
        init_test("try_variants_succeed_when_uncontended");
        let lock = ReentrantRwLock::new();

        assert!(lock.try_write_lock());
        assert!(lock.try_write_lock());
        assert!(lock.try_read_lock());
        lock.unlock();
        lock.unlock();
        lock.unlock();
        assert!(!lock.is_locked_by_current_thread());
        crate::test_complete!("try_variants_succeed_when_uncontended");
    }

    #[test]
    fn try_write_fails_while_another_thread_reads() {
        init_test("try_write_fails_while_another_thread_reads");
        let lock = Arc::new(ReentrantRwLock::new());
        let (ready_tx, ready_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();

        let reader = Arc::clone(&lock);
        let handle = std::thread::spawn(move || {
            reader.read_lock();
            ready_tx.send(()).expect("main thread gone");
            release_rx.recv().expect("main thread gone");
            reader.unlock();
        });

        ready_rx.recv().expect("reader thread died");
        let acquired = lock.try_write_lock();
        crate::assert_with_log!(
            !acquired,
            "write refused while a foreign read is held",
            false,
            acquired
        );
        // Reads still coexist.
        assert!(lock.try_read_lock());
        lock.unlock();

        release_tx.send(()).expect("reader thread died");
        handle.join().expect("reader thread panicked");

        assert!(lock.try_write_lock());
        lock.unlock();
        crate::test_complete!("try_write_fails_while_another_thread_reads");
    }

    #[test]
    fn try_read_fails_while_another_thread_writes() {
        init_test("try_read_fails_while_another_thread_writes");
        let lock = Arc::new(ReentrantRwLock::new());
        let (ready_tx, ready_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();

        let writer = Arc::clone(&lock);
        let handle = std::thread::spawn(move || {
            writer.write_lock();
            ready_tx.send(()).expect("main thread gone");
            release_rx.recv().expect("main thread gone");
            writer.unlock();
        });

        ready_rx.recv().expect("writer thread died");
        assert!(!lock.try_read_lock());
        assert!(!lock.try_write_lock());

        release_tx.send(()).expect("writer thread died");
        handle.join().expect("writer thread panicked");
        crate::test_complete!("try_read_fails_while_another_thread_writes");
    }

    #[test]
    fn pause_resume_restores_exact_depths() {
        init_test("pause_resume_restores_exact_depths");
        let lock = ReentrantRwLock::new();

        lock.write_lock();
        lock.write_lock();
        lock.read_lock();
        lock.pause();

        crate::assert_with_log!(
            !lock.is_locked_by_current_thread(),
            "paused thread holds nothing",
            false,
            lock.is_locked_by_current_thread()
        );
        let state = lock.debug_state();
        assert_eq!(state.snapshots.len(), 1);

        lock.resume();
        let state = lock.debug_state();
        assert_eq!(state.write_depth, 2);
        assert_eq!(state.read_depth.len(), 1);
        assert_eq!(state.snapshots.len(), 0);

        lock.unlock();
        lock.unlock();
        lock.unlock();
        crate::assert_with_log!(
            !lock.is_locked_by_current_thread(),
            "original depth drained by exactly three unlocks",
            false,
            lock.is_locked_by_current_thread()
        );
        crate::test_complete!("pause_resume_restores_exact_depths");
    }

    #[test]
    fn pause_of_read_only_state_restores_reads() {
        init_test("pause_of_read_only_state_restores_reads");
        let lock = ReentrantRwLock::new();

        lock.read_lock();
        lock.read_lock();
        lock.pause();
        assert!(!lock.is_locked_by_current_thread());

        lock.resume();
        let state = lock.debug_state();
        assert_eq!(state.read_depth.get(&thread::current().id()), Some(&2));
        assert_eq!(state.write_depth, 0);

        lock.unlock();
        lock.unlock();
        crate::test_complete!("pause_of_read_only_state_restores_reads");
    }

    #[test]
    fn pause_with_nothing_held_is_a_noop() {
        init_test("pause_with_nothing_held_is_a_noop");
        let lock = ReentrantRwLock::new();
        lock.pause();
        lock.resume();
        crate::assert_with_log!(
            !lock.is_locked_by_current_thread(),
            "still unlocked",
            false,
            lock.is_locked_by_current_thread()
        );
        assert!(lock.debug_state().snapshots.is_empty());
        crate::test_complete!("pause_with_nothing_held_is_a_noop");
    }

    #[test]
    fn resume_without_pause_is_a_noop() {
        init_test("resume_without_pause_is_a_noop");
        let lock = ReentrantRwLock::new();
        lock.resume();
        assert!(!lock.is_locked_by_current_thread());
        crate::test_complete!("resume_without_pause_is_a_noop");
    }

    #[test]
    fn pause_releases_the_physical_lock_to_other_threads() {
        init_test("pause_releases_the_physical_lock_to_other_threads");
        let lock = Arc::new(ReentrantRwLock::new());

        lock.write_lock();
        lock.write_lock();
        lock.pause();

        let other = Arc::clone(&lock);
        let handle = std::thread::spawn(move || {
            let acquired = other.try_write_lock();
            if acquired {
                other.unlock();
            }
            acquired
        });
        let acquired = handle.join().expect("thread panicked");
        crate::assert_with_log!(
            acquired,
            "other thread acquired during the pause window",
            true,
            acquired
        );

        lock.resume();
        assert!(lock.is_locked_by_current_thread());
        lock.unlock();
        lock.unlock();
        crate::test_complete!("pause_releases_the_physical_lock_to_other_threads");
    }

    #[test]
    fn dependency_allows_correct_order_and_reentry() {
        init_test("dependency_allows_correct_order_and_reentry");
        let a = Arc::new(ReentrantRwLock::new());
        let b = Arc::new(ReentrantRwLock::new());
        b.set_dependent_lock(&a);

        // b before a is the declared order; re-entering b while holding it
        // stays legal regardless of a.
        b.write_lock();
        a.write_lock();
        b.read_lock();
        b.unlock();
        a.unlock();
        b.unlock();
        crate::test_complete!("dependency_allows_correct_order_and_reentry");
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "declared lock dependency")]
    fn dependency_violation_is_fatal() {
        let a = Arc::new(ReentrantRwLock::new());
        let b = Arc::new(ReentrantRwLock::new());
        b.set_dependent_lock(&a);

        a.write_lock();
        b.write_lock();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "no outstanding read locks")]
    fn write_after_own_read_is_fatal() {
        let lock = ReentrantRwLock::new();
        lock.read_lock();
        lock.write_lock();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "holds no acquisition")]
    fn strict_unlock_with_nothing_held_is_fatal() {
        let lock = ReentrantRwLock::new();
        lock.unlock();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "while paused")]
    fn acquiring_while_paused_is_fatal() {
        let lock = ReentrantRwLock::new();
        lock.write_lock();
        lock.pause();
        lock.read_lock();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "already paused")]
    fn double_pause_is_fatal() {
        let lock = ReentrantRwLock::new();
        lock.write_lock();
        lock.pause();
        lock.pause();
    }

    #[test]
    fn reset_returns_to_the_initial_state() {
        init_test("reset_returns_to_the_initial_state");
        let mut lock = ReentrantRwLock::new();
        lock.write_lock();
        lock.read_lock();

        lock.reset();
        assert!(!lock.is_locked_by_current_thread());
        let state = lock.debug_state();
        assert_eq!(state.write_depth, 0);
        assert!(state.read_depth.is_empty());
        assert!(state.snapshots.is_empty());
        assert!(state.dependency.is_none());

        // The physical lock is usable again.
        assert!(lock.try_write_lock());
        lock.unlock();
        crate::test_complete!("reset_returns_to_the_initial_state");
    }

    #[test]
    fn guards_release_on_drop() {
        init_test("guards_release_on_drop");
        let lock = ReentrantRwLock::new();
        {
            let _write = lock.write();
            let _read = lock.read();
            assert!(lock.is_locked_by_current_thread());
        }
        assert!(!lock.is_locked_by_current_thread());
        crate::test_complete!("guards_release_on_drop");
    }

    #[test]
    fn debug_formats_without_deadlocking() {
        let lock = ReentrantRwLock::new();
        lock.read_lock();
        let dbg = format!("{lock:?}");
        assert!(dbg.contains("ReentrantRwLock"));
        lock.unlock();
    }

    #[cfg(feature = "lock-metrics")]
    #[test]
    fn metrics_count_acquisitions_and_pauses() {
        init_test("metrics_count_acquisitions_and_pauses");
        let lock = ReentrantRwLock::new();

        lock.write_lock();
        lock.read_lock();
        lock.pause();
        lock.resume();
        lock.unlock();
        lock.unlock();

        let snap = lock.metrics_snapshot();
        // write_lock + resume's write reacquisition.
        assert_eq!(snap.write_acquisitions, 2);
        assert_eq!(snap.read_acquisitions, 1);
        assert_eq!(snap.pauses, 1);
        assert_eq!(snap.resumes, 1);

        lock.reset_metrics();
        assert_eq!(lock.metrics_snapshot().write_acquisitions, 0);
        crate::test_complete!("metrics_count_acquisitions_and_pauses");
    }
}
