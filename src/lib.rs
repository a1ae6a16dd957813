//! Reentrant synchronization primitives for preemptible OS threads.
//!
//! The centerpiece is [`ReentrantRwLock`], a reader-writer lock that a
//! single thread may acquire recursively — in read mode, write mode, or a
//! writer nesting reads — while paying the physical blocking cost only on
//! the first acquisition and the last release. On top of plain reentrancy
//! it supports:
//!
//! - **Pause/Resume**: a thread can save its entire nesting state and stop
//!   holding the lock while it blocks elsewhere, then reacquire the exact
//!   same nested state with one physical operation.
//! - **Lock-order checking**: a lock may declare one dependency; acquiring
//!   it while holding the dependency (a classic deadlock inversion) trips a
//!   debug assertion. The check compiles out in release builds.
//! - **Try-variants**: non-blocking acquisition reported as a boolean, with
//!   no bookkeeping mutated on failure.
//!
//! [`Gate`] is the companion one-shot event: a set/clear flag with blocking
//! and timed waits, for callers that need a bounded wait outside the lock.
//!
//! # Guarantees
//!
//! - At most one thread holds write ownership at any instant; readers
//!   coexist exactly as the underlying physical lock allows.
//! - For any sequence of matched acquisitions and releases by one thread,
//!   the physical lock is acquired exactly once and released exactly once.
//! - A paused thread is indistinguishable from a non-holder until it
//!   resumes.
//!
//! Contract violations (read-to-write upgrade, operating while paused,
//! strict unlock with nothing held, ordering violations) are programmer
//! errors: they fail fast in debug builds and are undefined in release
//! builds. Contention on the try-variants is an ordinary boolean outcome.
//!
//! # Example
//!
//! ```
//! use relock::ReentrantRwLock;
//!
//! let lock = ReentrantRwLock::new();
//! lock.write_lock();
//! lock.read_lock(); // a writer implicitly has read access
//! assert!(lock.is_locked_by_current_thread());
//! lock.unlock();
//! lock.unlock();
//! assert!(!lock.is_locked_by_current_thread());
//! ```
//!
//! # Feature flags
//!
//! - `lock-metrics`: per-lock counters for acquisitions, physical
//!   contention, and pause/resume transitions. See [`metrics`].

#![warn(missing_docs)]

pub mod gate;
pub mod metrics;
mod raw;
pub mod recursive;
pub mod test_logging;

pub use gate::Gate;
pub use metrics::LockMetricsSnapshot;
pub use recursive::{ReadGuard, ReentrantRwLock, WriteGuard};
