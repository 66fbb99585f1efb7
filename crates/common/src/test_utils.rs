//! Test utilities for usb-configurator
//!
//! Provides an in-memory [`UsbBus`] implementation that records every open,
//! write, and handle release so tests can assert on what reached the "device".
//!
//! # Example
//!
//! ```ignore
//! use common::bus::UsbBus;
//! use common::test_utils::{FakeBus, FakeDevice};
//!
//! let bus = FakeBus::new(vec![FakeDevice::new(1, 4, "AX88179A", 1)]);
//! let devices = bus.enumerate().unwrap();
//! assert_eq!(devices.len(), 1);
//! assert_eq!(devices[0].active_configuration, 1);
//! ```

use crate::bus::{ConfigurationHandle, UsbBus};
use crate::error::TransportError;
use crate::usb_types::{DeviceDescriptorView, DeviceIdentity};
use std::cell::RefCell;
use std::rc::Rc;

/// ASIX AX88179A vendor ID
pub const ASIX_VENDOR_ID: u16 = 0x0b95;
/// ASIX AX88179A product ID
pub const AX88179A_PRODUCT_ID: u16 = 0x1790;

/// One simulated device and the failures it should produce
#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub identity: DeviceIdentity,
    pub product: Option<String>,
    pub vendor_id: u16,
    pub product_id: u16,
    pub configuration: u8,
    open_error: Option<TransportError>,
    read_error: Option<TransportError>,
    write_error: Option<TransportError>,
    writes: usize,
}

impl FakeDevice {
    pub fn new(bus: u8, address: u8, product: &str, configuration: u8) -> Self {
        Self {
            identity: DeviceIdentity::new(bus, address),
            product: Some(product.to_string()),
            vendor_id: ASIX_VENDOR_ID,
            product_id: AX88179A_PRODUCT_ID,
            configuration,
            open_error: None,
            read_error: None,
            write_error: None,
            writes: 0,
        }
    }

    /// Device whose product string cannot be read
    pub fn unreadable(bus: u8, address: u8, configuration: u8) -> Self {
        Self {
            product: None,
            ..Self::new(bus, address, "", configuration)
        }
    }

    pub fn with_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    pub fn failing_open(mut self, err: TransportError) -> Self {
        self.open_error = Some(err);
        self
    }

    pub fn failing_read(mut self, err: TransportError) -> Self {
        self.read_error = Some(err);
        self
    }

    pub fn failing_write(mut self, err: TransportError) -> Self {
        self.write_error = Some(err);
        self
    }

    fn view(&self) -> DeviceDescriptorView {
        DeviceDescriptorView {
            identity: self.identity,
            product: self.product.clone(),
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            active_configuration: self.configuration,
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    devices: Vec<FakeDevice>,
    enumerate_error: Option<TransportError>,
    opens: usize,
    releases: usize,
}

impl FakeState {
    fn device_mut(&mut self, identity: DeviceIdentity) -> Option<&mut FakeDevice> {
        self.devices.iter_mut().find(|d| d.identity == identity)
    }
}

/// In-memory USB bus
///
/// Cloning shares the same simulated devices and counters.
#[derive(Debug, Clone, Default)]
pub struct FakeBus {
    state: Rc<RefCell<FakeState>>,
}

impl FakeBus {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            state: Rc::new(RefCell::new(FakeState {
                devices,
                ..FakeState::default()
            })),
        }
    }

    /// Make every subsequent enumeration fail
    pub fn fail_enumeration(&self, err: TransportError) {
        self.state.borrow_mut().enumerate_error = Some(err);
    }

    /// Remove a device, as if it were unplugged
    pub fn unplug(&self, identity: DeviceIdentity) {
        self.state
            .borrow_mut()
            .devices
            .retain(|d| d.identity != identity);
    }

    /// Current configuration of a device, `None` if not attached
    pub fn configuration_of(&self, identity: DeviceIdentity) -> Option<u8> {
        self.state
            .borrow()
            .devices
            .iter()
            .find(|d| d.identity == identity)
            .map(|d| d.configuration)
    }

    /// Set-configuration requests issued to one device, failed ones included
    pub fn writes_to(&self, identity: DeviceIdentity) -> usize {
        self.state
            .borrow()
            .devices
            .iter()
            .find(|d| d.identity == identity)
            .map_or(0, |d| d.writes)
    }

    /// Set-configuration requests issued across all devices
    pub fn total_writes(&self) -> usize {
        self.state.borrow().devices.iter().map(|d| d.writes).sum()
    }

    pub fn opens(&self) -> usize {
        self.state.borrow().opens
    }

    pub fn releases(&self) -> usize {
        self.state.borrow().releases
    }
}

impl UsbBus for FakeBus {
    type Handle = FakeHandle;

    fn enumerate(&self) -> Result<Vec<DeviceDescriptorView>, TransportError> {
        let state = self.state.borrow();
        if let Some(err) = &state.enumerate_error {
            return Err(err.clone());
        }
        Ok(state.devices.iter().map(FakeDevice::view).collect())
    }

    fn open(&self, identity: DeviceIdentity) -> Result<Option<FakeHandle>, TransportError> {
        let mut state = self.state.borrow_mut();
        let Some(device) = state.device_mut(identity) else {
            return Ok(None);
        };
        if let Some(err) = &device.open_error {
            return Err(err.clone());
        }
        state.opens += 1;

        Ok(Some(FakeHandle {
            state: Rc::clone(&self.state),
            identity,
        }))
    }
}

/// Handle returned by [`FakeBus::open`]; counts a release when dropped
#[derive(Debug)]
pub struct FakeHandle {
    state: Rc<RefCell<FakeState>>,
    identity: DeviceIdentity,
}

impl ConfigurationHandle for FakeHandle {
    fn active_configuration(&self) -> Result<u8, TransportError> {
        let mut state = self.state.borrow_mut();
        let device = state
            .device_mut(self.identity)
            .ok_or(TransportError::NoDevice)?;
        match &device.read_error {
            Some(err) => Err(err.clone()),
            None => Ok(device.configuration),
        }
    }

    fn set_configuration(&mut self, value: u8) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        let device = state
            .device_mut(self.identity)
            .ok_or(TransportError::NoDevice)?;
        device.writes += 1;
        if let Some(err) = &device.write_error {
            return Err(err.clone());
        }
        device.configuration = value;
        Ok(())
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.state.borrow_mut().releases += 1;
    }
}
