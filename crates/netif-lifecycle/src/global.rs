//! Process-wide network context
//!
//! For callers that want the single-instance model of an embedded network
//! API. Everything else should own a [`Network`] and pass it around.

use crate::driver::DriverRegistry;
use crate::network::Network;
use crate::settings::LifecycleSettings;
use netif_core::{NetifError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

static NETWORK: RwLock<Option<Arc<Network>>> = parking_lot::const_rwlock(None);

/// Install and initialise the process-wide context.
///
/// If one is already installed it is kept, re-initialised, and returned; the
/// given drivers and settings are ignored.
pub fn init(drivers: DriverRegistry, settings: LifecycleSettings) -> Arc<Network> {
    let mut slot = NETWORK.write();
    let network = match slot.as_ref() {
        Some(network) => {
            debug!("global network context already installed");
            Arc::clone(network)
        }
        None => {
            let network = Arc::new(Network::new(drivers, settings));
            *slot = Some(Arc::clone(&network));
            network
        }
    };
    network.init();
    network
}

/// The installed context.
///
/// # Errors
///
/// `NotInitialized` if [`init`] has not run since the last [`deinit`].
pub fn instance() -> Result<Arc<Network>> {
    NETWORK.read().clone().ok_or(NetifError::NotInitialized)
}

/// Deinitialise and uninstall the process-wide context. Safe to call when
/// nothing is installed.
pub fn deinit() {
    let network = NETWORK.write().take();
    if let Some(network) = network {
        network.deinit();
    }
}
