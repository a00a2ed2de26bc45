//! Lifecycle settings
//!
//! Settings are read from TOML and may be overridden by `NETIF_*` environment
//! variables:
//!
//! ```toml
//! in_flight_policy = "join"   # or "reject"
//! implicit_attach = false
//! ```

use netif_core::{NetifError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// What a caller gets when it asks for the same transition another caller
/// already has in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Wait for the in-flight driver call and return its outcome
    #[default]
    Join,
    /// Fail straight away with `TransitionInProgress`
    Reject,
}

impl FromStr for InFlightPolicy {
    type Err = NetifError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "join" => Ok(Self::Join),
            "reject" => Ok(Self::Reject),
            other => Err(NetifError::configuration(format!(
                "unknown in_flight_policy \"{other}\" (expected join or reject)"
            ))),
        }
    }
}

/// Tunables of the lifecycle facade
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleSettings {
    /// Arbitration for a second caller targeting an in-flight transition
    pub in_flight_policy: InFlightPolicy,
    /// Let `interface_up` with a payload attach an absent pair first instead
    /// of failing with `NotAttached`
    pub implicit_attach: bool,
}

impl LifecycleSettings {
    /// Prefix of the environment variables read by
    /// [`LifecycleSettings::merge_with_env`]
    pub const ENV_PREFIX: &'static str = "NETIF_";

    /// Keys accepted by [`LifecycleSettings::set_from_string`]
    pub const KEYS: &'static [&'static str] = &["in_flight_policy", "implicit_attach"];

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| NetifError::configuration(format!("invalid settings: {e}")))
    }

    /// Load settings from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NetifError::configuration(format!(
                "failed to read settings file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `NETIF_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_from_vars(std::env::vars())
    }

    /// Apply `NETIF_*` overrides from an explicit set of variables.
    ///
    /// Variables without the prefix, and prefixed ones that name no setting
    /// (`NETIF_LOG` and the like), are ignored. A known setting with an
    /// unparsable value is still an error.
    pub fn merge_from_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(Self::ENV_PREFIX) else {
                continue;
            };
            let name = name.to_ascii_lowercase();
            if Self::KEYS.contains(&name.as_str()) {
                self.set_from_string(&name, value.as_ref())?;
            } else {
                debug!(variable = key.as_ref(), "ignoring unrecognised settings variable");
            }
        }
        Ok(())
    }

    /// Set one setting from its string form
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "in_flight_policy" => self.in_flight_policy = value.parse()?,
            "implicit_attach" => {
                self.implicit_attach = value.trim().parse().map_err(|_| {
                    NetifError::configuration(format!(
                        "implicit_attach must be true or false, got \"{value}\""
                    ))
                })?;
            }
            other => {
                return Err(NetifError::configuration(format!(
                    "unknown setting \"{other}\""
                )))
            }
        }
        Ok(())
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| NetifError::configuration(format!("failed to encode settings: {e}")))
    }
}
