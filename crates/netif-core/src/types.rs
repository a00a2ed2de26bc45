//! Identifiers and states shared by the lifecycle layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one physical module instance.
///
/// Handles are created and destroyed by the device layer; the lifecycle layer
/// borrows them for the duration of a call and never frees them. The raw value
/// zero is reserved as the null handle and is rejected wherever a handle is
/// required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceHandle(u64);

impl DeviceHandle {
    /// The null handle, never valid for a lifecycle operation
    pub const NULL: Self = Self(0);

    /// Wrap a raw handle value issued by the device layer
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw handle value
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Whether this is the null handle
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev-{:#x}", self.0)
    }
}

/// Communication technology exposed by a module.
///
/// The tag is carried by every configuration payload so a payload can be
/// cross-checked against the interface it is offered to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    /// No technology; never a valid interface
    #[default]
    None,
    /// Short-range radio (Bluetooth Low Energy)
    Ble,
    /// Cellular
    Cell,
    /// Wireless LAN
    Wifi,
    /// Satellite positioning
    Gnss,
}

impl Technology {
    /// Every technology that can back an interface
    pub const ALL: [Technology; 4] = [
        Technology::Ble,
        Technology::Cell,
        Technology::Wifi,
        Technology::Gnss,
    ];

    /// Short lowercase name used in logs
    pub const fn name(&self) -> &'static str {
        match self {
            Technology::None => "none",
            Technology::Ble => "ble",
            Technology::Cell => "cell",
            Technology::Wifi => "wifi",
            Technology::Gnss => "gnss",
        }
    }

    /// Whether this tag names a real interface
    pub const fn is_interface(&self) -> bool {
        !matches!(self, Technology::None)
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of one (handle, technology) pair.
///
/// ```text
/// Absent --attach--> ConfiguredDown --up(ok)--> Up --down(ok)--> ConfiguredDown --detach--> Absent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceState {
    /// No entry for the pair; initial and terminal
    #[default]
    Absent,
    /// Attached with a configuration but not connected
    ConfiguredDown,
    /// Brought up by a successful driver call
    Up,
}

impl InterfaceState {
    /// Whether `self -> to` is one of the four edges of the lifecycle.
    ///
    /// Same-state requests are not edges; callers treat them as no-ops.
    pub const fn can_transition_to(&self, to: InterfaceState) -> bool {
        matches!(
            (self, to),
            (InterfaceState::Absent, InterfaceState::ConfiguredDown)
                | (InterfaceState::ConfiguredDown, InterfaceState::Up)
                | (InterfaceState::Up, InterfaceState::ConfiguredDown)
                | (InterfaceState::ConfiguredDown, InterfaceState::Absent)
        )
    }
}

impl fmt::Display for InterfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterfaceState::Absent => "absent",
            InterfaceState::ConfiguredDown => "configured-down",
            InterfaceState::Up => "up",
        };
        f.write_str(name)
    }
}
