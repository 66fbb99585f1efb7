//! USB subsystem
//!
//! Locating devices by product string and moving them to a configuration:
//! - `device`: libusb backend for the `UsbBus` capability traits
//! - `locator`: enumeration and name/VID:PID matching
//! - `applier`: idempotent per-device set-configuration
//! - `filter`: VID:PID filter parsing

pub mod applier;
pub mod device;
pub mod filter;
pub mod locator;

pub use applier::apply;
pub use device::RusbBus;
pub use filter::VidPidFilter;
pub use locator::locate;
