//! Feature-gated lock metrics.
//!
//! With the `lock-metrics` feature enabled, [`ReentrantRwLock`] counts
//! logical acquisitions, physical-lock contention, and pause/resume
//! transitions. When the feature is disabled the snapshot type still exists
//! (so callers can compile unconditionally) but every snapshot is empty and
//! no counters are stored.
//!
//! [`ReentrantRwLock`]: crate::recursive::ReentrantRwLock

/// Snapshot of a lock's metrics counters.
///
/// Counters are updated with relaxed atomics; a snapshot taken while the
/// lock is in use is internally consistent per field, not across fields.
#[derive(Debug, Clone, Default)]
pub struct LockMetricsSnapshot {
    /// Logical read acquisitions. Every nesting level counts, including
    /// acquisitions that never touched the physical lock.
    pub read_acquisitions: u64,
    /// Logical write acquisitions, counted the same way.
    pub write_acquisitions: u64,
    /// Physical acquisitions that found the lock held by another thread.
    pub contentions: u64,
    /// Pause operations that saved a snapshot (no-op pauses are not counted).
    pub pauses: u64,
    /// Resume operations that restored a snapshot.
    pub resumes: u64,
}

#[cfg(feature = "lock-metrics")]
pub(crate) use counters::Counters;

#[cfg(feature = "lock-metrics")]
mod counters {
    use super::LockMetricsSnapshot;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Default)]
    pub(crate) struct Counters {
        read_acquisitions: AtomicU64,
        write_acquisitions: AtomicU64,
        contentions: AtomicU64,
        pauses: AtomicU64,
        resumes: AtomicU64,
    }

    impl Counters {
        pub(crate) fn record_read(&self) {
            self.read_acquisitions.fetch_add(1, Ordering::Relaxed);
        }

        pub(crate) fn record_write(&self) {
            self.write_acquisitions.fetch_add(1, Ordering::Relaxed);
        }

        pub(crate) fn record_contention(&self) {
            self.contentions.fetch_add(1, Ordering::Relaxed);
        }

        pub(crate) fn record_pause(&self) {
            self.pauses.fetch_add(1, Ordering::Relaxed);
        }

        pub(crate) fn record_resume(&self) {
            self.resumes.fetch_add(1, Ordering::Relaxed);
        }

        pub(crate) fn snapshot(&self) -> LockMetricsSnapshot {
            LockMetricsSnapshot {
                read_acquisitions: self.read_acquisitions.load(Ordering::Relaxed),
                write_acquisitions: self.write_acquisitions.load(Ordering::Relaxed),
                contentions: self.contentions.load(Ordering::Relaxed),
                pauses: self.pauses.load(Ordering::Relaxed),
                resumes: self.resumes.load(Ordering::Relaxed),
            }
        }

        pub(crate) fn reset(&self) {
            self.read_acquisitions.store(0, Ordering::Relaxed);
            self.write_acquisitions.store(0, Ordering::Relaxed);
            self.contentions.store(0, Ordering::Relaxed);
            self.pauses.store(0, Ordering::Relaxed);
            self.resumes.store(0, Ordering::Relaxed);
        }
    }
}
