//! Scripted interface drivers
//!
//! A [`MockDriver`] stands in for a technology driver. It records every call,
//! returns whatever status codes the test scripts, and can be gated so a call
//! stays in flight until the test releases it.

use crate::resources::{Resource, ResourceLedger};
use async_trait::async_trait;
use netif_core::{BleConfig, CellConfig, DeviceHandle, GnssConfig, TechnologyConfig, WifiConfig};
use netif_lifecycle::{InterfaceDriver, StatusCode};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

/// One call seen by a [`MockDriver`]
#[derive(Debug, Clone)]
pub enum DriverEvent<C> {
    /// `up` with the narrowed payload the driver received
    Up {
        /// Device handle
        handle: DeviceHandle,
        /// Payload
        config: C,
    },
    /// `down`
    Down {
        /// Device handle
        handle: DeviceHandle,
    },
}

impl<C> DriverEvent<C> {
    /// Whether this is an `up` call
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up { .. })
    }

    /// Handle the call was made for
    pub fn handle(&self) -> DeviceHandle {
        match self {
            Self::Up { handle, .. } | Self::Down { handle } => *handle,
        }
    }
}

/// Scripted driver for the technology of `C`
pub struct MockDriver<C> {
    events: Mutex<Vec<DriverEvent<C>>>,
    up_status: AtomicI32,
    down_status: AtomicI32,
    gate: Option<Semaphore>,
    entered: Notify,
    active: AtomicUsize,
    max_active: AtomicUsize,
    ledger: Option<(Arc<ResourceLedger>, Vec<Resource>)>,
}

/// Mock BLE driver
pub type MockBle = MockDriver<BleConfig>;
/// Mock cellular driver
pub type MockCell = MockDriver<CellConfig>;
/// Mock Wi-Fi driver
pub type MockWifi = MockDriver<WifiConfig>;
/// Mock GNSS driver
pub type MockGnss = MockDriver<GnssConfig>;

impl<C> Default for MockDriver<C> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            up_status: AtomicI32::new(0),
            down_status: AtomicI32::new(0),
            gate: None,
            entered: Notify::new(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            ledger: None,
        }
    }
}

impl<C: TechnologyConfig> fmt::Debug for MockDriver<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDriver")
            .field("technology", &C::TECHNOLOGY)
            .field("calls", &self.call_count())
            .field("gated", &self.gate.is_some())
            .finish()
    }
}

impl<C: TechnologyConfig> MockDriver<C> {
    /// Driver that succeeds immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver whose calls block until [`MockDriver::release`] lets them
    /// through
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    /// Charge `resources` to `ledger` on every successful `up` and refund
    /// them on every successful `down`
    pub fn with_ledger(mut self, ledger: Arc<ResourceLedger>, resources: Vec<Resource>) -> Self {
        self.ledger = Some((ledger, resources));
        self
    }

    /// Make later `up` calls return `code`
    pub fn fail_up_with(&self, code: i32) {
        self.up_status.store(code, Ordering::SeqCst);
    }

    /// Make later `down` calls return `code`
    pub fn fail_down_with(&self, code: i32) {
        self.down_status.store(code, Ordering::SeqCst);
    }

    /// Make later calls succeed again
    pub fn succeed(&self) {
        self.fail_up_with(0);
        self.fail_down_with(0);
    }

    /// Let `calls` gated calls proceed. No effect on an ungated driver.
    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    /// Wait until at least `count` calls have entered the driver
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let entered = self.entered.notified();
            if self.call_count() >= count {
                return;
            }
            entered.await;
        }
    }

    /// Every call so far, in order of entry
    pub fn events(&self) -> Vec<DriverEvent<C>> {
        self.events.lock().clone()
    }

    /// Number of calls so far
    pub fn call_count(&self) -> usize {
        self.events.lock().len()
    }

    /// Number of `up` calls so far
    pub fn up_calls(&self) -> usize {
        self.events.lock().iter().filter(|e| e.is_up()).count()
    }

    /// Number of `down` calls so far
    pub fn down_calls(&self) -> usize {
        self.events.lock().iter().filter(|e| !e.is_up()).count()
    }

    /// Payload of the most recent `up` call
    pub fn last_up_config(&self) -> Option<C> {
        self.events.lock().iter().rev().find_map(|event| match event {
            DriverEvent::Up { config, .. } => Some(config.clone()),
            DriverEvent::Down { .. } => None,
        })
    }

    /// Highest number of calls that were inside the driver at once
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn enter(&self, event: DriverEvent<C>) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.events.lock().push(event);
        self.entered.notify_waiters();

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn leave(&self, status: StatusCode, charge: bool) -> StatusCode {
        if status.is_success() {
            if let Some((ledger, resources)) = &self.ledger {
                for &resource in resources {
                    if charge {
                        ledger.acquire(resource);
                    } else {
                        ledger.release(resource);
                    }
                }
            }
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        status
    }
}

#[async_trait]
impl<C: TechnologyConfig> InterfaceDriver for MockDriver<C> {
    type Config = C;

    async fn up(&self, handle: DeviceHandle, config: &C) -> StatusCode {
        self.enter(DriverEvent::Up {
            handle,
            config: config.clone(),
        })
        .await;
        let status = StatusCode::new(self.up_status.load(Ordering::SeqCst));
        self.leave(status, true)
    }

    async fn down(&self, handle: DeviceHandle) -> StatusCode {
        self.enter(DriverEvent::Down { handle }).await;
        let status = StatusCode::new(self.down_status.load(Ordering::SeqCst));
        self.leave(status, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_scripts() {
        let driver = MockWifi::new();
        let handle = DeviceHandle::from_raw(7);

        assert!(driver.up(handle, &WifiConfig::default()).await.is_success());
        driver.fail_down_with(-4);
        assert_eq!(driver.down(handle).await, StatusCode::new(-4));

        assert_eq!(driver.up_calls(), 1);
        assert_eq!(driver.down_calls(), 1);
        assert_eq!(driver.events()[1].handle(), handle);
        assert!(driver.last_up_config().is_some());
    }

    #[tokio::test]
    async fn test_ledger_charged_on_success_only() {
        let ledger = Arc::new(ResourceLedger::new());
        let driver = MockCell::new().with_ledger(ledger.clone(), vec![Resource::Uart]);
        let handle = DeviceHandle::from_raw(1);

        driver.up(handle, &CellConfig::default()).await;
        assert_eq!(ledger.outstanding(Resource::Uart), 1);

        driver.fail_down_with(-1);
        driver.down(handle).await;
        assert_eq!(ledger.outstanding(Resource::Uart), 1);

        driver.succeed();
        driver.down(handle).await;
        assert_eq!(ledger.outstanding(Resource::Uart), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_gate_holds_calls() {
        let driver = Arc::new(MockGnss::gated());
        let handle = DeviceHandle::from_raw(3);

        let task = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.down(handle).await })
        };
        driver.wait_for_calls(1).await;
        assert!(!task.is_finished());

        driver.release(1);
        assert!(task.await.unwrap().is_success());
    }
}
