//! Configuration applier
//!
//! Moves one device to the requested configuration. The device is looked up
//! again by bus and address right before the write; the handle is released
//! when `apply` returns, on every path.

use common::bus::{ConfigurationHandle, UsbBus};
use common::{ApplyError, ConfigurationRequest, ConfigurationResult, DeviceOutcome};
use tracing::{debug, info, warn};

/// Apply one configuration request. Never retries.
pub fn apply<B: UsbBus>(bus: &B, request: &ConfigurationRequest) -> DeviceOutcome {
    let identity = request.target;
    let desired = request.desired_configuration;

    let mut handle = match bus.open(identity) {
        Ok(Some(handle)) => handle,
        Ok(None) => {
            warn!("{} is no longer present", identity);
            return DeviceOutcome::failed(identity, None, ApplyError::DeviceVanished);
        }
        Err(e) => {
            warn!("Failed to open {}: {}", identity, e);
            return DeviceOutcome::failed(identity, None, e.into());
        }
    };

    let current = match handle.active_configuration() {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read active configuration of {}: {}", identity, e);
            return DeviceOutcome::failed(identity, None, e.into());
        }
    };

    if current == desired {
        debug!("{} already in configuration {}", identity, desired);
        return DeviceOutcome {
            identity,
            previous_configuration: Some(current),
            result: ConfigurationResult::Unchanged,
        };
    }

    debug!(
        "Switching {} from configuration {} to {}",
        identity, current, desired
    );

    match handle.set_configuration(desired) {
        Ok(()) => {
            info!(
                "Configured {}: configuration {} -> {}",
                identity, current, desired
            );
            DeviceOutcome {
                identity,
                previous_configuration: Some(current),
                result: ConfigurationResult::Applied,
            }
        }
        Err(e) => {
            warn!(
                "Failed to set configuration {} on {}: {}",
                desired, identity, e
            );
            DeviceOutcome::failed(identity, Some(current), e.into())
        }
    }
}
