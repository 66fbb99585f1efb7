//! USB device identity, snapshots, and per-device results

use crate::error::ApplyError;
use serde::Serialize;
use std::fmt;

/// Bus number plus device address
///
/// Identifies one attached device for the lifetime of a single scan. The
/// address may be reassigned after a replug, so this is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceIdentity {
    pub bus: u8,
    pub address: u8,
}

impl DeviceIdentity {
    pub fn new(bus: u8, address: u8) -> Self {
        Self { bus, address }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus {:03} address {:03}", self.bus, self.address)
    }
}

/// Read-only snapshot of a device taken during enumeration
///
/// Handed around by value. Any later read or write re-resolves the device by
/// [`DeviceIdentity`] instead of going through this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptorView {
    pub identity: DeviceIdentity,
    /// Product string, `None` if it could not be read
    pub product: Option<String>,
    pub vendor_id: u16,
    pub product_id: u16,
    /// `bConfigurationValue` of the active configuration, 0 when unconfigured
    pub active_configuration: u8,
}

impl DeviceDescriptorView {
    /// True if the product string contains `fragment` (case-sensitive)
    pub fn matches_name(&self, fragment: &str) -> bool {
        self.product
            .as_deref()
            .is_some_and(|product| product.contains(fragment))
    }
}

/// Intent to move one device to a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationRequest {
    pub target: DeviceIdentity,
    pub desired_configuration: u8,
}

impl ConfigurationRequest {
    pub fn new(target: DeviceIdentity, desired_configuration: u8) -> Self {
        Self {
            target,
            desired_configuration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationResult {
    /// Already in the desired configuration, nothing written
    Unchanged,
    /// Set-configuration request succeeded
    Applied,
    Failed(ApplyError),
}

impl ConfigurationResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, ConfigurationResult::Failed(_))
    }

    /// Short status label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            ConfigurationResult::Unchanged => "unchanged",
            ConfigurationResult::Applied => "applied",
            ConfigurationResult::Failed(_) => "failed",
        }
    }
}

/// Result of one apply attempt, attributed to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutcome {
    pub identity: DeviceIdentity,
    /// Configuration read before any write; `None` if the read never happened
    pub previous_configuration: Option<u8>,
    pub result: ConfigurationResult,
}

impl DeviceOutcome {
    pub fn failed(identity: DeviceIdentity, previous: Option<u8>, err: ApplyError) -> Self {
        Self {
            identity,
            previous_configuration: previous,
            result: ConfigurationResult::Failed(err),
        }
    }
}
