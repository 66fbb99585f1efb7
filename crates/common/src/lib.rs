//! Common building blocks for usb-configurator
//!
//! This crate provides the device identity and result types, the error
//! taxonomy, the `UsbBus` capability traits the locator and applier are
//! written against, and logging setup.

pub mod bus;
pub mod error;
pub mod logging;
pub mod usb_types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use bus::{ConfigurationHandle, UsbBus};
pub use error::{ApplyError, Error, Result, RunError, TransportError};
pub use logging::setup_logging;
pub use usb_types::{
    ConfigurationRequest, ConfigurationResult, DeviceDescriptorView, DeviceIdentity,
    DeviceOutcome,
};
