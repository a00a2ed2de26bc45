//! Driver capability trait and the dispatch router
//!
//! Each technology module implements [`InterfaceDriver`] once and is
//! registered with a [`DriverRegistry`] at startup. The registry resolves a
//! technology tag to its driver, checks the payload tag against the tag it
//! was asked to route, and forwards the call. Driver status codes come back
//! unchanged; retry policy belongs to the driver.

use async_trait::async_trait;
use netif_core::{DeviceHandle, NetifError, NetworkConfig, Result, Technology, TechnologyConfig};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Status returned by a driver entry point: zero on success, a
/// driver-defined non-zero code on failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(i32);

impl StatusCode {
    /// Success
    pub const SUCCESS: Self = Self(0);

    /// Wrap a raw driver code
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Raw code
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Whether the driver reported success
    pub const fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// Convert to a result, attributing failures to `technology`
    pub fn into_result(self, technology: Technology) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(NetifError::driver_failure(technology, self.0))
        }
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry points a technology driver exposes to the lifecycle layer.
///
/// Both calls may block for as long as the radio or modem needs. A driver's
/// `up` must itself be safe to call on an interface that is already up.
#[async_trait]
pub trait InterfaceDriver: Send + Sync + 'static {
    /// Payload shape this driver consumes; fixes the driver's technology
    type Config: TechnologyConfig;

    /// Bring the interface up on `handle` using the narrowed payload
    async fn up(&self, handle: DeviceHandle, config: &Self::Config) -> StatusCode;

    /// Take the interface down on `handle`
    async fn down(&self, handle: DeviceHandle) -> StatusCode;
}

#[async_trait]
impl<D: InterfaceDriver> InterfaceDriver for Arc<D> {
    type Config = D::Config;

    async fn up(&self, handle: DeviceHandle, config: &Self::Config) -> StatusCode {
        self.as_ref().up(handle, config).await
    }

    async fn down(&self, handle: DeviceHandle) -> StatusCode {
        self.as_ref().down(handle).await
    }
}

/// A single routed call
#[derive(Debug, Clone, Copy)]
pub enum DriverCall<'a> {
    /// Bring the interface up with this payload
    Up(&'a NetworkConfig),
    /// Take the interface down
    Down,
}

/// Type-erased driver as stored in the registry
#[async_trait]
trait RoutableDriver: Send + Sync {
    async fn up(&self, handle: DeviceHandle, config: &NetworkConfig) -> Result<()>;

    async fn down(&self, handle: DeviceHandle) -> Result<()>;
}

struct Routed<D>(D);

#[async_trait]
impl<D: InterfaceDriver> RoutableDriver for Routed<D> {
    async fn up(&self, handle: DeviceHandle, config: &NetworkConfig) -> Result<()> {
        let technology = D::Config::TECHNOLOGY;
        let shape = D::Config::from_config(config).ok_or(NetifError::TagMismatch {
            expected: technology,
            actual: config.technology(),
        })?;
        self.0.up(handle, shape).await.into_result(technology)
    }

    async fn down(&self, handle: DeviceHandle) -> Result<()> {
        self.0
            .down(handle)
            .await
            .into_result(D::Config::TECHNOLOGY)
    }
}

/// Registry of drivers, at most one per technology
#[derive(Default, Clone)]
pub struct DriverRegistry {
    drivers: HashMap<Technology, Arc<dyn RoutableDriver>>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("technologies", &self.registered_technologies())
            .finish()
    }
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the driver for its technology.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a driver is already registered for the
    /// technology.
    pub fn register<D: InterfaceDriver>(&mut self, driver: D) -> Result<()> {
        let technology = D::Config::TECHNOLOGY;
        if self.drivers.contains_key(&technology) {
            return Err(NetifError::invalid(format!(
                "driver already registered for {technology}"
            )));
        }
        self.drivers.insert(technology, Arc::new(Routed(driver)));
        debug!(%technology, "registered interface driver");
        Ok(())
    }

    /// Builder form of [`DriverRegistry::register`]
    pub fn with_driver<D: InterfaceDriver>(mut self, driver: D) -> Result<Self> {
        self.register(driver)?;
        Ok(self)
    }

    /// Check if a driver is registered for a technology
    pub fn is_registered(&self, technology: Technology) -> bool {
        self.drivers.contains_key(&technology)
    }

    /// Fail with `NoDriverRegistered` unless a driver serves `technology`
    pub fn ensure_registered(&self, technology: Technology) -> Result<()> {
        if self.is_registered(technology) {
            Ok(())
        } else {
            Err(NetifError::NoDriverRegistered { technology })
        }
    }

    /// Technologies with a registered driver, in tag order
    pub fn registered_technologies(&self) -> Vec<Technology> {
        let mut technologies: Vec<_> = self.drivers.keys().copied().collect();
        technologies.sort();
        technologies
    }

    /// Route one call to the driver for `technology`.
    ///
    /// # Errors
    ///
    /// - `TagMismatch` if an `Up` payload is not tagged `technology`
    /// - `NoDriverRegistered` if the technology has no driver
    /// - `DriverFailure` carrying the driver's code
    pub async fn route(
        &self,
        handle: DeviceHandle,
        technology: Technology,
        call: DriverCall<'_>,
    ) -> Result<()> {
        if let DriverCall::Up(config) = call {
            if config.technology() != technology {
                return Err(NetifError::TagMismatch {
                    expected: technology,
                    actual: config.technology(),
                });
            }
        }
        let driver = self
            .drivers
            .get(&technology)
            .cloned()
            .ok_or(NetifError::NoDriverRegistered { technology })?;

        let result = match call {
            DriverCall::Up(config) => {
                debug!(%handle, %technology, "routing driver up");
                driver.up(handle, config).await
            }
            DriverCall::Down => {
                debug!(%handle, %technology, "routing driver down");
                driver.down(handle).await
            }
        };

        if let Err(err) = &result {
            warn!(%handle, %technology, code = err.code(), "driver call failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netif_core::{CellConfig, WifiConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingWifi {
        ups: AtomicUsize,
        downs: AtomicUsize,
        last_ssid: parking_lot::Mutex<Option<String>>,
    }

    #[async_trait]
    impl InterfaceDriver for CountingWifi {
        type Config = WifiConfig;

        async fn up(&self, _handle: DeviceHandle, config: &WifiConfig) -> StatusCode {
            self.ups.fetch_add(1, Ordering::SeqCst);
            *self.last_ssid.lock() = Some(config.ssid.clone());
            StatusCode::SUCCESS
        }

        async fn down(&self, _handle: DeviceHandle) -> StatusCode {
            self.downs.fetch_add(1, Ordering::SeqCst);
            StatusCode::new(-9)
        }
    }

    fn wifi_config() -> NetworkConfig {
        WifiConfig {
            ssid: "lab".to_string(),
            ..Default::default()
        }
        .into()
    }

    #[tokio::test]
    async fn test_routes_to_registered_driver() {
        let driver = Arc::new(CountingWifi::default());
        let registry = DriverRegistry::new().with_driver(driver.clone()).unwrap();
        let handle = DeviceHandle::from_raw(1);

        registry
            .route(handle, Technology::Wifi, DriverCall::Up(&wifi_config()))
            .await
            .unwrap();

        assert_eq!(driver.ups.load(Ordering::SeqCst), 1);
        assert_eq!(driver.last_ssid.lock().as_deref(), Some("lab"));
    }

    #[tokio::test]
    async fn test_driver_code_passed_through() {
        let driver = Arc::new(CountingWifi::default());
        let registry = DriverRegistry::new().with_driver(driver.clone()).unwrap();

        let err = registry
            .route(DeviceHandle::from_raw(1), Technology::Wifi, DriverCall::Down)
            .await
            .unwrap_err();

        assert_eq!(err, NetifError::driver_failure(Technology::Wifi, -9));
        assert_eq!(driver.downs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_and_mismatched() {
        let driver = Arc::new(CountingWifi::default());
        let registry = DriverRegistry::new().with_driver(driver.clone()).unwrap();
        let handle = DeviceHandle::from_raw(1);

        let err = registry
            .route(handle, Technology::Cell, DriverCall::Down)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            NetifError::NoDriverRegistered {
                technology: Technology::Cell
            }
        );

        let cell: NetworkConfig = CellConfig::default().into();
        let err = registry
            .route(handle, Technology::Wifi, DriverCall::Up(&cell))
            .await
            .unwrap_err();
        assert!(matches!(err, NetifError::TagMismatch { .. }));
        assert_eq!(driver.ups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_driver_per_technology() {
        let mut registry = DriverRegistry::new();
        registry.register(CountingWifi::default()).unwrap();
        assert!(registry.register(CountingWifi::default()).is_err());
        assert_eq!(registry.registered_technologies(), vec![Technology::Wifi]);
    }

    #[test]
    fn test_status_code() {
        assert!(StatusCode::SUCCESS.into_result(Technology::Ble).is_ok());
        assert_eq!(
            StatusCode::from(-3).into_result(Technology::Ble),
            Err(NetifError::driver_failure(Technology::Ble, -3))
        );
    }
}
