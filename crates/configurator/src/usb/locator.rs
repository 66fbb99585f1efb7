//! Device locator
//!
//! Finds the devices whose product string contains a name fragment.

use super::filter::{VidPidFilter, allowed_by};
use common::bus::UsbBus;
use common::{DeviceDescriptorView, TransportError};
use tracing::debug;

/// Enumerate the bus and keep devices whose product string contains `fragment`.
///
/// Devices without a readable product string are skipped. Matches keep the
/// enumeration order. An empty result is not an error.
pub fn locate<B: UsbBus>(
    bus: &B,
    fragment: &str,
    filters: &[VidPidFilter],
) -> Result<Vec<DeviceDescriptorView>, TransportError> {
    let devices = bus.enumerate()?;

    let matched: Vec<_> = devices
        .into_iter()
        .filter(|device| {
            if device.product.is_none() {
                debug!("Skipping {}: product string unavailable", device.identity);
                return false;
            }
            if !device.matches_name(fragment) {
                return false;
            }
            if !allowed_by(filters, device.vendor_id, device.product_id) {
                debug!(
                    "Device ignored by filter: {} vid={:#06x}, pid={:#06x}",
                    device.identity, device.vendor_id, device.product_id
                );
                return false;
            }
            true
        })
        .collect();

    debug!("{} device(s) match '{}'", matched.len(), fragment);
    Ok(matched)
}
