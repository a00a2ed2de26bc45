//! Log setup for tests

use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness writer.
///
/// Honours `RUST_LOG`, defaulting to debug for the netif crates. Safe to
/// call from every test; only the first call installs the subscriber.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("netif_lifecycle=debug,netif_core=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
