//! Wireless LAN payload

use super::{versioned, ConfigVersion, NetworkConfig, TechnologyConfig};
use crate::errors::{NetifError, Result};
use crate::types::Technology;
use serde::{Deserialize, Serialize};

/// Access point authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiAuthentication {
    /// No authentication
    #[default]
    Open,
    /// WPA/WPA2/WPA3 pre-shared key
    WpaPsk,
}

impl WifiAuthentication {
    /// Numeric value used by the module
    pub const fn value(&self) -> i32 {
        match self {
            WifiAuthentication::Open => 1,
            WifiAuthentication::WpaPsk => 2,
        }
    }
}

/// Operating mode of the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiMode {
    /// Join an access point
    #[default]
    Station,
    /// Act as an access point
    AccessPoint,
    /// Both at once
    StationAndAccessPoint,
}

/// Configuration for a Wi-Fi interface
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    /// Payload version; see the per-field notes
    pub version: ConfigVersion,
    /// Access point SSID
    pub ssid: String,
    /// Access point authentication mode
    pub authentication: WifiAuthentication,
    /// Pass phrase; `None` for open networks
    pub pass_phrase: Option<String>,
    // End of version 0.
    /// DHCP host name. Honoured from version 1; `None` (module default) below
    /// that.
    pub host_name: Option<String>,
    /// Radio mode. Honoured from version 2; [`WifiMode::Station`] below that.
    pub mode: WifiMode,
}

impl WifiConfig {
    /// Minimum version for [`WifiConfig::host_name`]
    pub const HOST_NAME_MIN_VERSION: ConfigVersion = ConfigVersion::V1;
    /// Minimum version for [`WifiConfig::mode`]
    pub const MODE_MIN_VERSION: ConfigVersion = ConfigVersion::V2;
}

impl TechnologyConfig for WifiConfig {
    const TECHNOLOGY: Technology = Technology::Wifi;
    const LATEST_VERSION: ConfigVersion = ConfigVersion::V2;

    fn version(&self) -> ConfigVersion {
        self.version
    }

    fn apply_version_defaults(self) -> Self {
        let version = self.version;
        Self {
            host_name: versioned(version, Self::HOST_NAME_MIN_VERSION, self.host_name, || {
                None
            }),
            mode: versioned(version, Self::MODE_MIN_VERSION, self.mode, WifiMode::default),
            ..self
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ssid.is_empty() {
            return Err(NetifError::invalid("wifi ssid must not be empty"));
        }
        if self.authentication == WifiAuthentication::WpaPsk
            && self.pass_phrase.as_deref().map_or(true, str::is_empty)
        {
            return Err(NetifError::invalid(
                "wifi WPA authentication requires a pass phrase",
            ));
        }
        Ok(())
    }

    fn from_config(config: &NetworkConfig) -> Option<&Self> {
        match config {
            NetworkConfig::Wifi(config) => Some(config),
            _ => None,
        }
    }

    fn into_config(self) -> NetworkConfig {
        NetworkConfig::Wifi(self)
    }
}
