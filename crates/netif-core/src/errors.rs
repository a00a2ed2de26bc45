//! Unified error type for netif operations
//!
//! Every failure the lifecycle layer can report is a variant of [`NetifError`].
//! Driver failures carry the driver's own status code untouched; everything
//! else maps onto a stable negative code via [`NetifError::code`] for callers
//! that only deal in result codes.

use crate::config::ConfigVersion;
use crate::types::{DeviceHandle, InterfaceState, Technology};
use serde::{Deserialize, Serialize};

/// Stable negative result codes for the non-driver error variants
pub mod codes {
    /// The lifecycle layer has not been initialised
    pub const NOT_INITIALIZED: i32 = -2;
    /// No driver is registered for the requested technology
    pub const NO_DRIVER_REGISTERED: i32 = -3;
    /// Payload version is newer than this build understands
    pub const UNSUPPORTED_VERSION: i32 = -4;
    /// Malformed handle, tag or payload
    pub const INVALID_ARGUMENT: i32 = -5;
    /// Payload tag differs from the requested technology
    pub const TAG_MISMATCH: i32 = -6;
    /// No state exists for the (handle, technology) pair
    pub const NOT_ATTACHED: i32 = -11;
    /// Another call is transitioning the same pair
    pub const TRANSITION_IN_PROGRESS: i32 = -17;
    /// State already exists for the (handle, technology) pair
    pub const ALREADY_ATTACHED: i32 = -18;
    /// The interface must be taken down first
    pub const INTERFACE_STILL_UP: i32 = -19;
    /// The requested edge is not part of the lifecycle
    pub const INVALID_TRANSITION: i32 = -20;
    /// An in-flight transition was abandoned before completing
    pub const INTERRUPTED: i32 = -21;
    /// Lifecycle settings could not be loaded or are invalid
    pub const CONFIGURATION: i32 = -22;
}

/// Unified error type for all netif operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum NetifError {
    /// Malformed handle, technology tag or payload
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument
        message: String,
    },

    /// The payload's embedded tag differs from the requested technology
    #[error("Tag mismatch: expected {expected} payload, got {actual}")]
    TagMismatch {
        /// Technology the caller asked for
        expected: Technology,
        /// Technology embedded in the payload
        actual: Technology,
    },

    /// The payload declares a version newer than this build understands
    #[error("Unsupported {technology} configuration version {version} (newest supported is {supported})")]
    UnsupportedVersion {
        /// Technology of the payload
        technology: Technology,
        /// Version declared by the payload
        version: ConfigVersion,
        /// Newest version this build understands
        supported: ConfigVersion,
    },

    /// State already exists for the pair
    #[error("{technology} interface already attached to {handle}")]
    AlreadyAttached {
        /// Device handle
        handle: DeviceHandle,
        /// Technology
        technology: Technology,
    },

    /// No state exists for the pair
    #[error("{technology} interface not attached to {handle}")]
    NotAttached {
        /// Device handle
        handle: DeviceHandle,
        /// Technology
        technology: Technology,
    },

    /// The interface is up and must be taken down first
    #[error("{technology} interface on {handle} is still up")]
    InterfaceStillUp {
        /// Device handle
        handle: DeviceHandle,
        /// Technology
        technology: Technology,
    },

    /// The technology has no registered driver in this build
    #[error("No driver registered for {technology}")]
    NoDriverRegistered {
        /// Technology without a driver
        technology: Technology,
    },

    /// Opaque failure reported by the technology driver
    #[error("{technology} driver failed with code {code}")]
    DriverFailure {
        /// Technology whose driver failed
        technology: Technology,
        /// Driver status code, passed through unchanged
        code: i32,
    },

    /// The lifecycle layer has not been initialised, or was deinitialised
    /// while the call was in progress
    #[error("Network layer not initialized")]
    NotInitialized,

    /// Another call is already transitioning the pair
    #[error("{technology} interface on {handle} is transitioning to {target}")]
    TransitionInProgress {
        /// Device handle
        handle: DeviceHandle,
        /// Technology
        technology: Technology,
        /// Target state of the in-flight transition
        target: InterfaceState,
    },

    /// The requested edge is not part of the lifecycle
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: InterfaceState,
        /// Requested state
        to: InterfaceState,
    },

    /// The in-flight call this caller joined was abandoned
    #[error("{technology} transition on {handle} was interrupted")]
    Interrupted {
        /// Device handle
        handle: DeviceHandle,
        /// Technology
        technology: Technology,
    },

    /// Lifecycle settings could not be loaded or are invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// What went wrong
        message: String,
    },
}

impl NetifError {
    /// Create an invalid argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a driver failure carrying the driver's status code
    pub fn driver_failure(technology: Technology, code: i32) -> Self {
        Self::DriverFailure { technology, code }
    }

    /// Negative result code for this error.
    ///
    /// Driver failures return the driver's code as-is.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => codes::INVALID_ARGUMENT,
            Self::TagMismatch { .. } => codes::TAG_MISMATCH,
            Self::UnsupportedVersion { .. } => codes::UNSUPPORTED_VERSION,
            Self::AlreadyAttached { .. } => codes::ALREADY_ATTACHED,
            Self::NotAttached { .. } => codes::NOT_ATTACHED,
            Self::InterfaceStillUp { .. } => codes::INTERFACE_STILL_UP,
            Self::NoDriverRegistered { .. } => codes::NO_DRIVER_REGISTERED,
            Self::DriverFailure { code, .. } => *code,
            Self::NotInitialized => codes::NOT_INITIALIZED,
            Self::TransitionInProgress { .. } => codes::TRANSITION_IN_PROGRESS,
            Self::InvalidTransition { .. } => codes::INVALID_TRANSITION,
            Self::Interrupted { .. } => codes::INTERRUPTED,
            Self::Configuration { .. } => codes::CONFIGURATION,
        }
    }

    /// Whether the error came from the technology driver
    pub fn is_driver_failure(&self) -> bool {
        matches!(self, Self::DriverFailure { .. })
    }
}

/// Standard Result type for netif operations
pub type Result<T> = std::result::Result<T, NetifError>;
