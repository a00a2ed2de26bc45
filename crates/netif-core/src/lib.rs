//! Core vocabulary for the netif interface lifecycle layer
//!
//! This crate holds the types every other netif crate speaks in:
//! - [`DeviceHandle`]: opaque identifier of one physical module, owned by the
//!   device layer and only borrowed here
//! - [`Technology`]: the tag identifying one communication interface
//! - [`InterfaceState`]: the per (handle, technology) lifecycle state
//! - [`NetworkConfig`]: the tagged family of versioned configuration payloads
//!   and the narrowing rules that turn a caller payload into a validated one
//! - [`NetifError`]: the single error type used across the workspace
//!
//! Nothing in here performs I/O or holds shared state.

pub mod config;
pub mod errors;
pub mod types;

pub use config::{
    narrow, narrow_as, versioned_fields, BleConfig, BleRole, CellConfig, ConfigVersion,
    DynamicModel, GnssConfig, GnssModuleType, NetworkConfig, TechnologyConfig, VersionedField,
    WifiAuthentication, WifiConfig, WifiMode,
};
pub use errors::{NetifError, Result};
pub use types::{DeviceHandle, InterfaceState, Technology};
