//! Satellite positioning payload

use super::{versioned, ConfigVersion, NetworkConfig, TechnologyConfig};
use crate::errors::{NetifError, Result};
use crate::types::{DeviceHandle, Technology};
use serde::{Deserialize, Serialize};

/// Positioning engine fitted to, or reachable through, the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GnssModuleType {
    /// M8 series
    #[default]
    M8,
    /// M9 series
    M9,
    /// M10 series
    M10,
}

/// Platform dynamics assumed by the navigation filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicModel {
    /// General purpose
    #[default]
    Portable,
    /// Fixed position
    Stationary,
    /// Walking speed
    Pedestrian,
    /// Road vehicle
    Automotive,
    /// Sea vessel
    Sea,
}

/// Configuration for a positioning interface
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GnssConfig {
    /// Payload version; see the per-field notes
    pub version: ConfigVersion,
    /// Positioning engine type
    pub module_type: GnssModuleType,
    /// Intermediate module the engine is reached through, e.g. a cellular
    /// module with a GNSS chip behind it; `None` when directly attached
    pub via_device: Option<DeviceHandle>,
    /// Pin of the intermediate module that powers the engine
    pub pin_power: Option<u8>,
    /// Pin of the intermediate module that signals data ready
    pub pin_data_ready: Option<u8>,
    // End of version 0.
    /// Dynamic model. Honoured from version 1; [`DynamicModel::Portable`]
    /// below that.
    pub dynamic_model: DynamicModel,
    /// Forward NMEA sentences alongside UBX messages. Honoured from version 2;
    /// `false` below that.
    pub include_nmea: bool,
}

impl GnssConfig {
    /// Minimum version for [`GnssConfig::dynamic_model`]
    pub const DYNAMIC_MODEL_MIN_VERSION: ConfigVersion = ConfigVersion::V1;
    /// Minimum version for [`GnssConfig::include_nmea`]
    pub const INCLUDE_NMEA_MIN_VERSION: ConfigVersion = ConfigVersion::V2;
}

impl TechnologyConfig for GnssConfig {
    const TECHNOLOGY: Technology = Technology::Gnss;
    const LATEST_VERSION: ConfigVersion = ConfigVersion::V2;

    fn version(&self) -> ConfigVersion {
        self.version
    }

    fn apply_version_defaults(self) -> Self {
        let version = self.version;
        Self {
            dynamic_model: versioned(
                version,
                Self::DYNAMIC_MODEL_MIN_VERSION,
                self.dynamic_model,
                DynamicModel::default,
            ),
            include_nmea: versioned(
                version,
                Self::INCLUDE_NMEA_MIN_VERSION,
                self.include_nmea,
                || false,
            ),
            ..self
        }
    }

    fn validate(&self) -> Result<()> {
        match self.via_device {
            Some(handle) if handle.is_null() => {
                Err(NetifError::invalid("gnss via_device must not be the null handle"))
            }
            None if self.pin_power.is_some() || self.pin_data_ready.is_some() => Err(
                NetifError::invalid("gnss intermediate pins given without via_device"),
            ),
            _ => Ok(()),
        }
    }

    fn from_config(config: &NetworkConfig) -> Option<&Self> {
        match config {
            NetworkConfig::Gnss(config) => Some(config),
            _ => None,
        }
    }

    fn into_config(self) -> NetworkConfig {
        NetworkConfig::Gnss(self)
    }
}
