//! Interface lifecycle for multi-technology communication modules
//!
//! One physical module (a device handle) may carry several interfaces:
//! BLE, cellular, Wi-Fi, GNSS. This crate tracks each (handle, technology)
//! pair through `Absent -> ConfiguredDown -> Up` and back, routing the
//! bring-up and take-down calls to the driver registered for the
//! technology.
//!
//! # Layers
//!
//! - [`driver`]: the [`InterfaceDriver`] trait and the [`DriverRegistry`]
//!   that dispatches to it
//! - [`table`]: the [`StateTable`] of per-pair lifecycle state
//! - [`network`]: the [`Network`] facade callers use
//! - [`settings`]: tunables loaded from TOML and `NETIF_*` variables
//! - [`global`]: an optional process-wide [`Network`]
//!
//! # Example
//!
//! ```rust,ignore
//! let drivers = DriverRegistry::new().with_driver(my_cell_driver)?;
//! let network = Network::new(drivers, LifecycleSettings::default());
//! network.init();
//!
//! network.attach(handle, Technology::Cell, &cell_config.into())?;
//! network.interface_up(handle, Technology::Cell, None).await?;
//! // ... use the bearer
//! network.interface_down(handle, Technology::Cell).await?;
//! network.detach(handle, Technology::Cell)?;
//! network.deinit();
//! ```

pub mod driver;
pub mod global;
pub mod network;
pub mod settings;
pub mod table;

pub use driver::{DriverCall, DriverRegistry, InterfaceDriver, StatusCode};
pub use network::Network;
pub use settings::{InFlightPolicy, LifecycleSettings};
pub use table::{EntrySnapshot, StateTable, TableSnapshot};

// Re-export the vocabulary so callers need a single dependency
pub use netif_core::{
    DeviceHandle, InterfaceState, NetifError, NetworkConfig, Result, Technology, TechnologyConfig,
};
