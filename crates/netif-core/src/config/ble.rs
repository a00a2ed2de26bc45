//! Short-range radio (BLE) payload

use super::{versioned, ConfigVersion, NetworkConfig, TechnologyConfig};
use crate::errors::{NetifError, Result};
use crate::types::Technology;
use serde::{Deserialize, Serialize};

/// Role the module takes on the BLE link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BleRole {
    /// Radio present but not advertising or scanning
    #[default]
    Disabled,
    /// Central only
    Central,
    /// Peripheral only
    Peripheral,
    /// Central and peripheral at once
    CentralAndPeripheral,
}

/// Configuration for a BLE interface
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Payload version; see the per-field notes
    pub version: ConfigVersion,
    /// Link role
    pub role: BleRole,
    /// Start the serial port service server
    pub sps_server: bool,
    // End of version 0.
    /// Advertised device name. Honoured from version 1; `None` (module
    /// default name) below that.
    pub device_name: Option<String>,
    /// Simultaneous central connections. Honoured from version 2; `1` below
    /// that.
    pub max_connections: u8,
}

impl BleConfig {
    /// Minimum version for [`BleConfig::device_name`]
    pub const DEVICE_NAME_MIN_VERSION: ConfigVersion = ConfigVersion::V1;
    /// Minimum version for [`BleConfig::max_connections`]
    pub const MAX_CONNECTIONS_MIN_VERSION: ConfigVersion = ConfigVersion::V2;
    /// Connection limit used when the payload predates the field
    pub const DEFAULT_MAX_CONNECTIONS: u8 = 1;
}

impl TechnologyConfig for BleConfig {
    const TECHNOLOGY: Technology = Technology::Ble;
    const LATEST_VERSION: ConfigVersion = ConfigVersion::V2;

    fn version(&self) -> ConfigVersion {
        self.version
    }

    fn apply_version_defaults(self) -> Self {
        let version = self.version;
        Self {
            device_name: versioned(
                version,
                Self::DEVICE_NAME_MIN_VERSION,
                self.device_name,
                || None,
            ),
            max_connections: versioned(
                version,
                Self::MAX_CONNECTIONS_MIN_VERSION,
                self.max_connections,
                || Self::DEFAULT_MAX_CONNECTIONS,
            ),
            ..self
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(NetifError::invalid(
                "ble max_connections must be greater than 0",
            ));
        }
        if matches!(&self.device_name, Some(name) if name.is_empty()) {
            return Err(NetifError::invalid("ble device_name must not be empty"));
        }
        Ok(())
    }

    fn from_config(config: &NetworkConfig) -> Option<&Self> {
        match config {
            NetworkConfig::Ble(config) => Some(config),
            _ => None,
        }
    }

    fn into_config(self) -> NetworkConfig {
        NetworkConfig::Ble(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_zero_ignores_appended_fields() {
        let config = BleConfig {
            role: BleRole::Peripheral,
            sps_server: true,
            device_name: Some("stale".to_string()),
            max_connections: 4,
            ..Default::default()
        }
        .apply_version_defaults();

        assert_eq!(config.role, BleRole::Peripheral);
        assert!(config.sps_server);
        assert_eq!(config.device_name, None);
        assert_eq!(config.max_connections, BleConfig::DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_fields_honoured_at_their_own_version() {
        let config = BleConfig {
            version: ConfigVersion::V1,
            device_name: Some("sensor".to_string()),
            max_connections: 4,
            ..Default::default()
        }
        .apply_version_defaults();

        // device_name arrived in v1, max_connections in v2
        assert_eq!(config.device_name.as_deref(), Some("sensor"));
        assert_eq!(config.max_connections, BleConfig::DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_zero_connections_rejected_at_v2() {
        let config = BleConfig {
            version: ConfigVersion::V2,
            ..Default::default()
        }
        .apply_version_defaults();

        assert!(config.validate().is_err());
    }
}
