//! Capability interface over the host USB stack
//!
//! The locator and applier only talk to the bus through these traits, so the
//! libusb backend can be swapped for an in-memory fake in tests.

use crate::error::TransportError;
use crate::usb_types::{DeviceDescriptorView, DeviceIdentity};

/// Host USB stack as seen by a single scan-and-fix pass
pub trait UsbBus {
    type Handle: ConfigurationHandle;

    /// Snapshot every visible device, in the order the host stack reports them.
    ///
    /// A device whose product string cannot be read is still returned, with
    /// `product: None`.
    fn enumerate(&self) -> Result<Vec<DeviceDescriptorView>, TransportError>;

    /// Open the device currently at `identity`.
    ///
    /// Returns `Ok(None)` when no such device is attached. The device is
    /// released when the handle is dropped.
    fn open(&self, identity: DeviceIdentity) -> Result<Option<Self::Handle>, TransportError>;
}

/// Open device, scoped to one read-then-maybe-write sequence
pub trait ConfigurationHandle {
    /// Current `bConfigurationValue`, 0 when unconfigured
    fn active_configuration(&self) -> Result<u8, TransportError>;

    fn set_configuration(&mut self, value: u8) -> Result<(), TransportError>;
}
