//! Cellular payload

use super::{versioned, ConfigVersion, NetworkConfig, TechnologyConfig};
use crate::errors::{NetifError, Result};
use crate::types::Technology;
use serde::{Deserialize, Serialize};

/// Configuration for a cellular interface
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    /// Payload version; see the per-field notes
    pub version: ConfigVersion,
    /// SIM PIN, if the SIM is locked
    pub sim_pin: Option<String>,
    /// Access point name; `None` lets the network choose
    pub apn: Option<String>,
    /// Seconds to wait for registration and activation; zero selects
    /// [`CellConfig::DEFAULT_TIMEOUT_SECONDS`]
    pub timeout_seconds: u32,
    /// APN user name
    pub username: Option<String>,
    /// APN password
    pub password: Option<String>,
    // End of version 0.
    /// MCC/MNC of the operator for manual selection. Honoured from version 1;
    /// `None` (automatic selection) below that.
    pub mcc_mnc: Option<String>,
    /// Return from bring-up as soon as the connection attempt is started
    /// rather than when it completes. Honoured from version 2; `false` below
    /// that.
    pub async_connect: bool,
}

impl CellConfig {
    /// Minimum version for [`CellConfig::mcc_mnc`]
    pub const MCC_MNC_MIN_VERSION: ConfigVersion = ConfigVersion::V1;
    /// Minimum version for [`CellConfig::async_connect`]
    pub const ASYNC_CONNECT_MIN_VERSION: ConfigVersion = ConfigVersion::V2;
    /// Connect timeout used when `timeout_seconds` is left at zero
    pub const DEFAULT_TIMEOUT_SECONDS: u32 = 240;

    /// Connect timeout the driver should apply
    pub fn effective_timeout_seconds(&self) -> u32 {
        if self.timeout_seconds == 0 {
            Self::DEFAULT_TIMEOUT_SECONDS
        } else {
            self.timeout_seconds
        }
    }
}

impl TechnologyConfig for CellConfig {
    const TECHNOLOGY: Technology = Technology::Cell;
    const LATEST_VERSION: ConfigVersion = ConfigVersion::V2;

    fn version(&self) -> ConfigVersion {
        self.version
    }

    fn apply_version_defaults(self) -> Self {
        let version = self.version;
        Self {
            mcc_mnc: versioned(version, Self::MCC_MNC_MIN_VERSION, self.mcc_mnc, || None),
            async_connect: versioned(
                version,
                Self::ASYNC_CONNECT_MIN_VERSION,
                self.async_connect,
                || false,
            ),
            ..self
        }
    }

    fn validate(&self) -> Result<()> {
        if self.password.is_some() && self.username.is_none() {
            return Err(NetifError::invalid("cell password given without username"));
        }
        if let Some(mcc_mnc) = &self.mcc_mnc {
            let valid = (5..=6).contains(&mcc_mnc.len())
                && mcc_mnc.chars().all(|c| c.is_ascii_digit());
            if !valid {
                return Err(NetifError::invalid(format!(
                    "cell mcc_mnc \"{mcc_mnc}\" must be 5 or 6 digits"
                )));
            }
        }
        Ok(())
    }

    fn from_config(config: &NetworkConfig) -> Option<&Self> {
        match config {
            NetworkConfig::Cell(config) => Some(config),
            _ => None,
        }
    }

    fn into_config(self) -> NetworkConfig {
        NetworkConfig::Cell(self)
    }
}
