//! Scan-and-fix pass
//!
//! Locates every matching device, then applies the requested configuration to
//! each one independently. Safe to re-run at any time; nothing carries over
//! between runs.

use crate::usb::{VidPidFilter, apply, locate};
use common::bus::UsbBus;
use common::{ConfigurationRequest, DeviceOutcome, RunError};
use tracing::{info, warn};

/// Default product name fragment (ASIX AX88179A USB-Ethernet adapter)
pub const DEFAULT_DEVICE_NAME: &str = "AX88179A";

/// Default `bConfigurationValue` to switch matching devices to
pub const DEFAULT_CONFIGURATION: u8 = 2;

/// Inputs for a single pass
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Substring of the product string to match
    pub device_name: String,
    pub desired_configuration: u8,
    pub filters: Vec<VidPidFilter>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            desired_configuration: DEFAULT_CONFIGURATION,
            filters: Vec::new(),
        }
    }
}

/// Locate matching devices and apply the configuration to each.
///
/// Returns one outcome per located device, in enumeration order. A failure
/// on one device never stops the remaining ones.
pub fn run<B: UsbBus>(bus: &B, options: &RunOptions) -> Result<Vec<DeviceOutcome>, RunError> {
    let devices =
        locate(bus, &options.device_name, &options.filters).map_err(RunError::Enumeration)?;

    if devices.is_empty() {
        return Err(RunError::NoDevicesFound {
            fragment: options.device_name.clone(),
        });
    }

    info!(
        "Found {} device(s) matching '{}', target configuration {}",
        devices.len(),
        options.device_name,
        options.desired_configuration
    );

    let outcomes: Vec<DeviceOutcome> = devices
        .into_iter()
        .map(|device| {
            let request = ConfigurationRequest::new(device.identity, options.desired_configuration);
            apply(bus, &request)
        })
        .collect();

    let failed = outcomes.iter().filter(|o| !o.result.is_success()).count();
    if failed > 0 {
        warn!("{} of {} device(s) failed", failed, outcomes.len());
    }

    Ok(outcomes)
}
