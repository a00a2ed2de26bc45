//! netif testing infrastructure
//!
//! Test doubles shared by the netif integration tests:
//! - [`drivers`]: scripted [`MockDriver`]s that record calls, fail on demand
//!   and can be held mid-call to exercise concurrent callers
//! - [`resources`]: the pass/fail resource-leak oracle
//! - [`logging`]: one-line `tracing` setup for tests
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! netif-testkit = { path = "../netif-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod drivers;
pub mod logging;
pub mod resources;

pub use drivers::{DriverEvent, MockBle, MockCell, MockDriver, MockGnss, MockWifi};
pub use logging::init_test_tracing;
pub use resources::{
    Resource, ResourceCheck, ResourceCounters, ResourceLedger, ResourceProbe, ResourceReport,
    ResourceThresholds,
};

use netif_core::DeviceHandle;

/// Handle with a recognisable raw value for test `n`
pub const fn test_handle(n: u64) -> DeviceHandle {
    DeviceHandle::from_raw(0x1000 + n)
}
