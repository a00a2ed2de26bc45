//! Versioned configuration payloads
//!
//! One payload shape exists per [`Technology`], collected in the
//! [`NetworkConfig`] sum type whose variant is the payload's technology tag.
//! Every shape carries a [`ConfigVersion`]:
//!
//! - version 0 means only the fields of the original release are populated;
//!   callers written against it fill those and leave the rest at
//!   `Default::default()`
//! - each field appended later documents the minimum version at which it is
//!   honoured; below that version the field is ignored and a hard-coded
//!   default is substituted
//!
//! Fields are only ever appended. Narrowing (see [`narrow`]) applies the
//! defaults field by field, since fields arrive at different versions.

mod ble;
mod cell;
mod gnss;
mod registry;
mod wifi;

pub use ble::{BleConfig, BleRole};
pub use cell::CellConfig;
pub use gnss::{DynamicModel, GnssConfig, GnssModuleType};
pub use registry::{narrow, narrow_as, versioned_fields, VersionedField};
pub use wifi::{WifiAuthentication, WifiConfig, WifiMode};

use crate::errors::Result;
use crate::types::Technology;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of a configuration payload.
///
/// Leave at zero unless a field documented with a higher minimum is set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConfigVersion(u32);

impl ConfigVersion {
    /// The original release
    pub const V0: Self = Self(0);
    /// First extension
    pub const V1: Self = Self(1);
    /// Second extension
    pub const V2: Self = Self(2);

    /// Create a version from its number
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// Get the version number
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Honour `value` only if the payload version reaches the field's minimum.
pub(crate) fn versioned<T>(
    version: ConfigVersion,
    minimum: ConfigVersion,
    value: T,
    default: impl FnOnce() -> T,
) -> T {
    if version >= minimum {
        value
    } else {
        default()
    }
}

/// Behaviour shared by every technology-specific payload shape
pub trait TechnologyConfig: Clone + fmt::Debug + Send + Sync + 'static {
    /// Technology this shape configures
    const TECHNOLOGY: Technology;

    /// Newest payload version this build understands
    const LATEST_VERSION: ConfigVersion;

    /// Version declared by the payload
    fn version(&self) -> ConfigVersion;

    /// Replace every field the declared version predates with its default
    fn apply_version_defaults(self) -> Self;

    /// Technology-specific sanity checks, run after defaults are applied
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Borrow this shape out of a payload, if the payload carries it
    fn from_config(config: &NetworkConfig) -> Option<&Self>;

    /// Wrap this shape as a payload
    fn into_config(self) -> NetworkConfig;
}

/// Configuration payload for one interface.
///
/// The variant is the payload's technology tag; it is fixed once the payload
/// is built and is checked against the technology a caller asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "technology", rename_all = "snake_case")]
pub enum NetworkConfig {
    /// Short-range radio
    Ble(BleConfig),
    /// Cellular
    Cell(CellConfig),
    /// Wireless LAN
    Wifi(WifiConfig),
    /// Satellite positioning
    Gnss(GnssConfig),
}

impl NetworkConfig {
    /// Technology tag embedded in the payload
    pub fn technology(&self) -> Technology {
        match self {
            NetworkConfig::Ble(_) => Technology::Ble,
            NetworkConfig::Cell(_) => Technology::Cell,
            NetworkConfig::Wifi(_) => Technology::Wifi,
            NetworkConfig::Gnss(_) => Technology::Gnss,
        }
    }

    /// Version declared by the payload
    pub fn version(&self) -> ConfigVersion {
        match self {
            NetworkConfig::Ble(config) => config.version(),
            NetworkConfig::Cell(config) => config.version(),
            NetworkConfig::Wifi(config) => config.version(),
            NetworkConfig::Gnss(config) => config.version(),
        }
    }
}

impl From<BleConfig> for NetworkConfig {
    fn from(config: BleConfig) -> Self {
        config.into_config()
    }
}

impl From<CellConfig> for NetworkConfig {
    fn from(config: CellConfig) -> Self {
        config.into_config()
    }
}

impl From<WifiConfig> for NetworkConfig {
    fn from(config: WifiConfig) -> Self {
        config.into_config()
    }
}

impl From<GnssConfig> for NetworkConfig {
    fn from(config: GnssConfig) -> Self {
        config.into_config()
    }
}
