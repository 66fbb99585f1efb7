//! usb-configurator
//!
//! Finds USB devices by a fragment of their product string and switches each
//! one to a given configuration (`bConfigurationValue`), skipping devices that
//! are already there. Meant to be re-run after every hotplug, e.g. for USB
//! Ethernet adapters that enumerate in a non-working default configuration.

pub mod config;
pub mod report;
pub mod runner;
pub mod usb;

pub use runner::{RunOptions, run};
