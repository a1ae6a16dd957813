//! Shared setup for the e2e suites.

/// Installs the tracing subscriber and the crate's test logger. Safe to call
/// from every test; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
    relock::test_logging::init_test_logging();
}
