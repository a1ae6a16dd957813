//! Test logging for unit and integration tests.
//!
//! Interleaving failures in lock tests are painful to debug from a bare
//! assertion message, so the test suites log phases, expected/actual values,
//! and completion markers with timestamps relative to test start. Verbosity
//! comes from the `TEST_LOG_LEVEL` environment variable.
//!
//! # Example
//!
//! ```
//! relock::test_logging::init_test_logging();
//! relock::test_phase!("setup");
//! let answer = 42;
//! relock::assert_with_log!(answer == 42, "answer", 42, answer);
//! relock::test_complete!("setup");
//! ```

use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

/// Logging verbosity level for tests.
///
/// Levels are ordered from least to most verbose:
/// `Error < Warn < Info < Debug < Trace`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TestLogLevel {
    /// Only failures.
    Error,
    /// Warnings and above.
    Warn,
    /// General test progress.
    #[default]
    Info,
    /// Detailed operation logging.
    Debug,
    /// Everything, including per-assertion confirmations.
    Trace,
}

impl TestLogLevel {
    /// Returns a human-readable name for the level.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Returns the level from the `TEST_LOG_LEVEL` environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("TEST_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl std::str::FromStr for TestLogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TestLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

struct LogState {
    level: TestLogLevel,
    start: Instant,
}

static STATE: OnceLock<LogState> = OnceLock::new();

/// Initializes test logging once per process. Later calls are no-ops.
pub fn init_test_logging() {
    STATE.get_or_init(|| LogState {
        level: TestLogLevel::from_env(),
        start: Instant::now(),
    });
}

/// Emits one log line if `level` is enabled. Callers normally go through
/// [`test_phase!`](crate::test_phase), [`assert_with_log!`](crate::assert_with_log),
/// and [`test_complete!`](crate::test_complete) instead.
pub fn emit(level: TestLogLevel, args: fmt::Arguments<'_>) {
    let Some(state) = STATE.get() else { return };
    if level > state.level {
        return;
    }
    eprintln!(
        "[{:>10.3?} {:>5}] {args}",
        state.start.elapsed(),
        level.name()
    );
}

/// Logs the start of a named test phase.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        $crate::test_logging::emit(
            $crate::test_logging::TestLogLevel::Info,
            format_args!("phase: {}", $name),
        )
    };
}

/// Asserts a condition, logging the expectation and the observed value on
/// failure before panicking.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $what:expr, $expected:expr, $actual:expr) => {{
        let ok = $cond;
        if !ok {
            $crate::test_logging::emit(
                $crate::test_logging::TestLogLevel::Error,
                format_args!(
                    "FAILED {}: expected {:?}, actual {:?}",
                    $what, $expected, $actual
                ),
            );
        } else {
            $crate::test_logging::emit(
                $crate::test_logging::TestLogLevel::Trace,
                format_args!("ok: {}", $what),
            );
        }
        assert!(ok, "{}", $what);
    }};
}

/// Logs successful completion of a named test.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        $crate::test_logging::emit(
            $crate::test_logging::TestLogLevel::Info,
            format_args!("complete: {}", $name),
        )
    };
}
