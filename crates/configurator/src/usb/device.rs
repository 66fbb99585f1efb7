//! libusb-backed implementation of the bus capabilities
//!
//! Wraps `rusb::Context` for enumeration and `rusb::DeviceHandle` for the
//! configuration read/write, mapping libusb errors into [`TransportError`].

use common::bus::{ConfigurationHandle, UsbBus};
use common::{DeviceDescriptorView, DeviceIdentity, TransportError};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, trace};

/// Default timeout for string descriptor control transfers
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Host USB stack accessed through libusb
pub struct RusbBus {
    context: Context,
    /// Timeout for descriptor string reads
    timeout: Duration,
}

impl RusbBus {
    /// Create a new libusb context
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let context = Context::new().map_err(map_rusb_error)?;
        Ok(Self { context, timeout })
    }

    /// Build a snapshot of one device, `None` if its device descriptor is unreadable
    fn describe(&self, device: &Device<Context>) -> Option<DeviceDescriptorView> {
        let identity = DeviceIdentity::new(device.bus_number(), device.address());

        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(e) => {
                debug!("Skipping {}: cannot read device descriptor: {}", identity, e);
                return None;
            }
        };

        let product = match self.read_product_string(device, &descriptor) {
            Ok(product) => product,
            Err(e) => {
                debug!("Cannot read product string of {}: {}", identity, e);
                None
            }
        };

        // libusb reports NotFound for an unconfigured device
        let active_configuration = device
            .active_config_descriptor()
            .map(|config| config.number())
            .unwrap_or(0);

        Some(DeviceDescriptorView {
            identity,
            product,
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            active_configuration,
        })
    }

    /// Read the product string in the first language of the string table
    fn read_product_string(
        &self,
        device: &Device<Context>,
        descriptor: &DeviceDescriptor,
    ) -> Result<Option<String>, rusb::Error> {
        if descriptor.product_string_index().is_none() {
            return Ok(None);
        }

        let handle = device.open()?;
        let languages = handle.read_languages(self.timeout)?;
        let Some(language) = languages.first().copied() else {
            return Ok(None);
        };

        let product = handle.read_product_string(language, descriptor, self.timeout)?;
        Ok(Some(product))
    }
}

impl UsbBus for RusbBus {
    type Handle = RusbHandle;

    fn enumerate(&self) -> Result<Vec<DeviceDescriptorView>, TransportError> {
        let devices = self.context.devices().map_err(map_rusb_error)?;

        let views: Vec<_> = devices
            .iter()
            .filter_map(|device| self.describe(&device))
            .collect();

        debug!("Enumerated {} devices", views.len());
        Ok(views)
    }

    fn open(&self, identity: DeviceIdentity) -> Result<Option<RusbHandle>, TransportError> {
        let devices = self.context.devices().map_err(map_rusb_error)?;

        let Some(device) = devices
            .iter()
            .find(|d| d.bus_number() == identity.bus && d.address() == identity.address)
        else {
            return Ok(None);
        };

        let handle = match device.open() {
            Ok(handle) => handle,
            // Gone between the device list and the open call
            Err(rusb::Error::NoDevice) => return Ok(None),
            Err(e) => return Err(map_rusb_error(e)),
        };

        trace!("Opened {}", identity);
        Ok(Some(RusbHandle { handle, identity }))
    }
}

/// Open libusb device; closed when dropped
pub struct RusbHandle {
    handle: DeviceHandle<Context>,
    identity: DeviceIdentity,
}

impl ConfigurationHandle for RusbHandle {
    fn active_configuration(&self) -> Result<u8, TransportError> {
        self.handle.active_configuration().map_err(map_rusb_error)
    }

    fn set_configuration(&mut self, value: u8) -> Result<(), TransportError> {
        self.handle
            .set_active_configuration(value)
            .map_err(map_rusb_error)
    }
}

impl Drop for RusbHandle {
    fn drop(&mut self) {
        trace!("Closing {}", self.identity);
    }
}

/// Map a libusb error to its transport error class
pub fn map_rusb_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::Access => TransportError::PermissionDenied,
        rusb::Error::NoDevice | rusb::Error::NotFound => TransportError::NoDevice,
        rusb::Error::Busy => TransportError::Busy,
        rusb::Error::Timeout => TransportError::Timeout,
        rusb::Error::Pipe => TransportError::Stall,
        rusb::Error::NotSupported => TransportError::NotSupported,
        other => TransportError::Other(other.to_string()),
    }
}
