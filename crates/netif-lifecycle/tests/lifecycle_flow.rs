//! Lifecycle flow integration tests
//!
//! Single-caller behaviour of the facade against scripted drivers: the full
//! attach, up, down, detach cycle, idempotent repeats, payload checks, and
//! what a failed driver call leaves behind.

#![allow(clippy::unwrap_used)]

use assert_matches::assert_matches;
use netif_core::{CellConfig, ConfigVersion, GnssConfig, WifiConfig, WifiMode};
use netif_lifecycle::{
    DeviceHandle, DriverRegistry, InterfaceState, LifecycleSettings, NetifError, Network,
    NetworkConfig, Technology,
};
use netif_testkit::{
    init_test_tracing, test_handle, MockCell, MockGnss, MockWifi, Resource, ResourceCheck,
    ResourceLedger, ResourceProbe,
};
use std::sync::Arc;

struct Fixture {
    network: Network,
    cell: Arc<MockCell>,
    wifi: Arc<MockWifi>,
    gnss: Arc<MockGnss>,
    ledger: Arc<ResourceLedger>,
}

/// Cell, Wi-Fi and GNSS drivers registered; BLE deliberately left out
fn fixture() -> Fixture {
    init_test_tracing();
    let ledger = Arc::new(ResourceLedger::new());
    let cell = Arc::new(
        MockCell::new().with_ledger(ledger.clone(), vec![Resource::Uart, Resource::OsResource]),
    );
    let wifi = Arc::new(MockWifi::new().with_ledger(ledger.clone(), vec![Resource::Spi]));
    let gnss = Arc::new(MockGnss::new().with_ledger(ledger.clone(), vec![Resource::I2c]));

    let drivers = DriverRegistry::new()
        .with_driver(cell.clone())
        .unwrap()
        .with_driver(wifi.clone())
        .unwrap()
        .with_driver(gnss.clone())
        .unwrap();
    let network = Network::new(drivers, LifecycleSettings::default());
    network.init();

    Fixture {
        network,
        cell,
        wifi,
        gnss,
        ledger,
    }
}

fn cell() -> NetworkConfig {
    CellConfig {
        apn: Some("internet".to_string()),
        ..Default::default()
    }
    .into()
}

fn wifi(ssid: &str) -> NetworkConfig {
    WifiConfig {
        ssid: ssid.to_string(),
        ..Default::default()
    }
    .into()
}

#[tokio::test]
async fn test_full_cycle_returns_to_baseline() {
    let f = fixture();
    let handle = test_handle(1);

    f.network.attach(handle, Technology::Cell, &cell()).unwrap();
    assert_eq!(
        f.network.state(handle, Technology::Cell).unwrap(),
        InterfaceState::ConfiguredDown
    );

    f.network
        .interface_up(handle, Technology::Cell, None)
        .await
        .unwrap();
    assert_eq!(
        f.network.state(handle, Technology::Cell).unwrap(),
        InterfaceState::Up
    );
    assert_eq!(f.ledger.outstanding(Resource::Uart), 1);
    assert_eq!(
        f.cell.last_up_config().unwrap().apn.as_deref(),
        Some("internet")
    );

    f.network
        .interface_down(handle, Technology::Cell)
        .await
        .unwrap();
    f.network.detach(handle, Technology::Cell).unwrap();
    assert!(f.network.snapshot().unwrap().is_empty());
    f.network.deinit();

    let report = ResourceCheck::default().run(f.ledger.as_ref(), "lifecycle: ", "*** ");
    assert!(report.is_clean(), "{report}");
    assert_eq!(f.network.entry_count(), 0);
}

#[tokio::test]
async fn test_repeated_transitions_are_noops() {
    let f = fixture();
    let handle = test_handle(2);
    f.network.attach(handle, Technology::Wifi, &wifi("lab")).unwrap();

    for _ in 0..3 {
        f.network
            .interface_up(handle, Technology::Wifi, None)
            .await
            .unwrap();
    }
    assert_eq!(f.wifi.up_calls(), 1);

    for _ in 0..3 {
        f.network
            .interface_down(handle, Technology::Wifi)
            .await
            .unwrap();
    }
    assert_eq!(f.wifi.down_calls(), 1);

    f.network.detach(handle, Technology::Wifi).unwrap();
    f.network.detach(handle, Technology::Wifi).unwrap();
    assert_eq!(
        f.network.state(handle, Technology::Wifi).unwrap(),
        InterfaceState::Absent
    );
}

#[tokio::test]
async fn test_tag_mismatch_creates_no_entry() {
    let f = fixture();
    let handle = test_handle(3);

    let err = f
        .network
        .attach(handle, Technology::Wifi, &cell())
        .unwrap_err();
    assert_eq!(
        err,
        NetifError::TagMismatch {
            expected: Technology::Wifi,
            actual: Technology::Cell,
        }
    );
    assert_eq!(f.network.entry_count(), 0);

    f.network.attach(handle, Technology::Wifi, &wifi("lab")).unwrap();
    let err = f
        .network
        .interface_up(handle, Technology::Wifi, Some(&cell()))
        .await
        .unwrap_err();
    assert_matches!(err, NetifError::TagMismatch { .. });
    assert_eq!(f.wifi.call_count(), 0);
    assert_eq!(
        f.network.state(handle, Technology::Wifi).unwrap(),
        InterfaceState::ConfiguredDown
    );
}

#[tokio::test]
async fn test_failed_up_is_retryable() {
    let f = fixture();
    let handle = test_handle(4);
    f.network.attach(handle, Technology::Cell, &cell()).unwrap();

    f.cell.fail_up_with(-8);
    let err = f
        .network
        .interface_up(handle, Technology::Cell, None)
        .await
        .unwrap_err();
    assert_eq!(err, NetifError::driver_failure(Technology::Cell, -8));
    assert_eq!(err.code(), -8);
    assert_eq!(
        f.network.state(handle, Technology::Cell).unwrap(),
        InterfaceState::ConfiguredDown
    );
    assert_eq!(f.ledger.outstanding(Resource::Uart), 0);

    f.cell.succeed();
    f.network
        .interface_up(handle, Technology::Cell, None)
        .await
        .unwrap();
    assert_eq!(f.cell.up_calls(), 2);
}

#[tokio::test]
async fn test_failed_down_keeps_interface_up() {
    let f = fixture();
    let handle = test_handle(5);
    f.network.attach(handle, Technology::Gnss, &GnssConfig::default().into()).unwrap();
    f.network
        .interface_up(handle, Technology::Gnss, None)
        .await
        .unwrap();

    f.gnss.fail_down_with(-3);
    assert_matches!(
        f.network.interface_down(handle, Technology::Gnss).await,
        Err(NetifError::DriverFailure { code: -3, .. })
    );
    assert_eq!(
        f.network.state(handle, Technology::Gnss).unwrap(),
        InterfaceState::Up
    );
    assert_eq!(
        f.network.detach(handle, Technology::Gnss),
        Err(NetifError::InterfaceStillUp {
            handle,
            technology: Technology::Gnss,
        })
    );

    f.gnss.succeed();
    f.network
        .interface_down(handle, Technology::Gnss)
        .await
        .unwrap();
    f.network.detach(handle, Technology::Gnss).unwrap();
}

#[tokio::test]
async fn test_transitions_require_attach() {
    let f = fixture();
    let handle = test_handle(6);

    assert_eq!(
        f.network.interface_up(handle, Technology::Cell, None).await,
        Err(NetifError::NotAttached {
            handle,
            technology: Technology::Cell,
        })
    );
    assert_matches!(
        f.network
            .interface_up(handle, Technology::Cell, Some(&cell()))
            .await,
        Err(NetifError::NotAttached { .. })
    );
    assert_matches!(
        f.network.interface_down(handle, Technology::Cell).await,
        Err(NetifError::NotAttached { .. })
    );
    assert_eq!(f.cell.call_count(), 0);
}

#[tokio::test]
async fn test_up_payload_is_remembered() {
    let f = fixture();
    let handle = test_handle(7);
    f.network.attach(handle, Technology::Wifi, &wifi("first")).unwrap();

    f.network
        .interface_up(handle, Technology::Wifi, Some(&wifi("second")))
        .await
        .unwrap();
    assert_eq!(f.wifi.last_up_config().unwrap().ssid, "second");

    f.network
        .interface_down(handle, Technology::Wifi)
        .await
        .unwrap();
    f.network
        .interface_up(handle, Technology::Wifi, None)
        .await
        .unwrap();
    assert_eq!(f.wifi.last_up_config().unwrap().ssid, "second");
}

#[tokio::test]
async fn test_driver_receives_version_defaults() {
    let f = fixture();
    let handle = test_handle(8);
    let v1: NetworkConfig = WifiConfig {
        version: ConfigVersion::V1,
        ssid: "lab".to_string(),
        host_name: Some("probe".to_string()),
        mode: WifiMode::AccessPoint,
        ..Default::default()
    }
    .into();

    f.network.attach(handle, Technology::Wifi, &v1).unwrap();
    f.network
        .interface_up(handle, Technology::Wifi, None)
        .await
        .unwrap();

    let seen = f.wifi.last_up_config().unwrap();
    assert_eq!(seen.host_name.as_deref(), Some("probe"));
    assert_eq!(seen.mode, WifiMode::Station);
}

#[tokio::test]
async fn test_interfaces_are_independent() {
    let f = fixture();
    let (first, second) = (test_handle(9), test_handle(10));

    f.network.attach(first, Technology::Cell, &cell()).unwrap();
    f.network.attach(first, Technology::Wifi, &wifi("lab")).unwrap();
    f.network.attach(second, Technology::Cell, &cell()).unwrap();

    f.network
        .interface_up(first, Technology::Cell, None)
        .await
        .unwrap();

    let snapshot = f.network.snapshot().unwrap();
    assert_eq!(snapshot.entries.len(), 3);
    assert_eq!(snapshot.for_handle(first).count(), 2);
    assert_eq!(
        f.network.state(first, Technology::Wifi).unwrap(),
        InterfaceState::ConfiguredDown
    );
    assert_eq!(
        f.network.state(second, Technology::Cell).unwrap(),
        InterfaceState::ConfiguredDown
    );
    assert_eq!(f.cell.events()[0].handle(), first);
}

#[tokio::test]
async fn test_payload_rejections() {
    let f = fixture();
    let handle = test_handle(11);

    // BLE has no driver in this build
    let err = f
        .network
        .attach(handle, Technology::Ble, &netif_core::BleConfig::default().into())
        .unwrap_err();
    assert_eq!(
        err,
        NetifError::NoDriverRegistered {
            technology: Technology::Ble
        }
    );

    let future: NetworkConfig = CellConfig {
        version: ConfigVersion::new(9),
        ..Default::default()
    }
    .into();
    assert_matches!(
        f.network.attach(handle, Technology::Cell, &future),
        Err(NetifError::UnsupportedVersion { .. })
    );

    assert_matches!(
        f.network.attach(handle, Technology::Wifi, &wifi("")),
        Err(NetifError::InvalidArgument { .. })
    );
    assert_matches!(
        f.network.attach(DeviceHandle::NULL, Technology::Cell, &cell()),
        Err(NetifError::InvalidArgument { .. })
    );
    assert_eq!(f.network.entry_count(), 0);
}

#[tokio::test]
async fn test_attach_twice_rejected() {
    let f = fixture();
    let handle = test_handle(12);

    f.network.attach(handle, Technology::Cell, &cell()).unwrap();
    assert_eq!(
        f.network.attach(handle, Technology::Cell, &cell()),
        Err(NetifError::AlreadyAttached {
            handle,
            technology: Technology::Cell,
        })
    );
}

#[tokio::test]
async fn test_deinit_does_not_tear_down() {
    let f = fixture();
    let handle = test_handle(13);
    f.network.attach(handle, Technology::Cell, &cell()).unwrap();
    f.network
        .interface_up(handle, Technology::Cell, None)
        .await
        .unwrap();

    f.network.deinit();
    assert_eq!(f.cell.down_calls(), 0);
    assert!(!f.network.is_initialized());
    assert_eq!(
        f.network.attach(handle, Technology::Cell, &cell()),
        Err(NetifError::NotInitialized)
    );

    // The driver still holds its UART, which the oracle reports
    let report = ResourceCheck::default().run(f.ledger.as_ref(), "", "LEAK ");
    assert!(!report.is_clean());
    assert_eq!(f.ledger.counters().uart_handles, 1);

    f.network.init();
    assert_eq!(
        f.network.state(handle, Technology::Cell).unwrap(),
        InterfaceState::Absent
    );
}

#[tokio::test]
async fn test_implicit_attach_setting() {
    init_test_tracing();
    let cell_driver = Arc::new(MockCell::new());
    let drivers = DriverRegistry::new().with_driver(cell_driver.clone()).unwrap();
    let settings = LifecycleSettings {
        implicit_attach: true,
        ..Default::default()
    };
    let network = Network::new(drivers, settings);
    network.init();
    let handle = test_handle(14);

    network
        .interface_up(handle, Technology::Cell, Some(&cell()))
        .await
        .unwrap();
    assert_eq!(
        network.state(handle, Technology::Cell).unwrap(),
        InterfaceState::Up
    );

    // Without a payload there is nothing to attach with
    assert_matches!(
        network.interface_up(test_handle(15), Technology::Cell, None).await,
        Err(NetifError::NotAttached { .. })
    );
    assert_eq!(cell_driver.up_calls(), 1);
}
