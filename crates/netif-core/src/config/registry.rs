//! Payload narrowing and the catalogue of versioned fields.
//!
//! [`narrow`] is the single gate every payload passes before it reaches a
//! driver: tag check, version ceiling, per-field defaults, then validation.

use super::{
    BleConfig, CellConfig, ConfigVersion, GnssConfig, NetworkConfig, TechnologyConfig, WifiConfig,
};
use crate::errors::{NetifError, Result};
use crate::types::Technology;

/// A payload field appended after the original release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionedField {
    /// Field name
    pub name: &'static str,
    /// First version at which the field is honoured
    pub min_version: ConfigVersion,
}

const fn field(name: &'static str, min_version: ConfigVersion) -> VersionedField {
    VersionedField { name, min_version }
}

const BLE_FIELDS: &[VersionedField] = &[
    field("device_name", BleConfig::DEVICE_NAME_MIN_VERSION),
    field("max_connections", BleConfig::MAX_CONNECTIONS_MIN_VERSION),
];

const CELL_FIELDS: &[VersionedField] = &[
    field("mcc_mnc", CellConfig::MCC_MNC_MIN_VERSION),
    field("async_connect", CellConfig::ASYNC_CONNECT_MIN_VERSION),
];

const WIFI_FIELDS: &[VersionedField] = &[
    field("host_name", WifiConfig::HOST_NAME_MIN_VERSION),
    field("mode", WifiConfig::MODE_MIN_VERSION),
];

const GNSS_FIELDS: &[VersionedField] = &[
    field("dynamic_model", GnssConfig::DYNAMIC_MODEL_MIN_VERSION),
    field("include_nmea", GnssConfig::INCLUDE_NMEA_MIN_VERSION),
];

/// Fields appended to a technology's payload since version 0.
///
/// Names match the serialized field names. The value substituted below
/// `min_version` is whatever the shape's
/// [`TechnologyConfig::apply_version_defaults`] puts there, so it is not
/// duplicated here.
pub fn versioned_fields(technology: Technology) -> &'static [VersionedField] {
    match technology {
        Technology::Ble => BLE_FIELDS,
        Technology::Cell => CELL_FIELDS,
        Technology::Wifi => WIFI_FIELDS,
        Technology::Gnss => GNSS_FIELDS,
        Technology::None => &[],
    }
}

/// Check a payload against the technology the caller asked for and return it
/// with version defaults applied.
///
/// # Errors
///
/// - `InvalidArgument` if `expected` is [`Technology::None`] or the payload
///   fails its technology's validation
/// - `TagMismatch` if the payload's tag is not `expected`
/// - `UnsupportedVersion` if the payload is newer than this build
pub fn narrow(config: &NetworkConfig, expected: Technology) -> Result<NetworkConfig> {
    if !expected.is_interface() {
        return Err(NetifError::invalid("technology none has no configuration"));
    }
    let actual = config.technology();
    if actual != expected {
        return Err(NetifError::TagMismatch { expected, actual });
    }

    let narrowed = match config {
        NetworkConfig::Ble(config) => narrow_shape(config)?.into_config(),
        NetworkConfig::Cell(config) => narrow_shape(config)?.into_config(),
        NetworkConfig::Wifi(config) => narrow_shape(config)?.into_config(),
        NetworkConfig::Gnss(config) => narrow_shape(config)?.into_config(),
    };
    Ok(narrowed)
}

/// Narrow a payload straight to its concrete shape.
///
/// Same checks as [`narrow`] with `T::TECHNOLOGY` as the expected tag.
pub fn narrow_as<T: TechnologyConfig>(config: &NetworkConfig) -> Result<T> {
    let actual = config.technology();
    let shape = T::from_config(config).ok_or(NetifError::TagMismatch {
        expected: T::TECHNOLOGY,
        actual,
    })?;
    narrow_shape(shape)
}

fn narrow_shape<T: TechnologyConfig>(shape: &T) -> Result<T> {
    let version = shape.version();
    if version > T::LATEST_VERSION {
        return Err(NetifError::UnsupportedVersion {
            technology: T::TECHNOLOGY,
            version,
            supported: T::LATEST_VERSION,
        });
    }

    let narrowed = shape.clone().apply_version_defaults();
    narrowed.validate()?;

    tracing::trace!(
        technology = %T::TECHNOLOGY,
        version = version.get(),
        "narrowed configuration payload"
    );
    Ok(narrowed)
}
