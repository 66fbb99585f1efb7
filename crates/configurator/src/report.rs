//! Run reporting and exit status policy

use common::{ApplyError, ConfigurationResult, DeviceOutcome, RunError, TransportError};
use serde::Serialize;

/// Output format for per-device results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Process exit status derived from a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every located device is in the desired configuration
    Success,
    /// At least one device failed
    DeviceFailed,
    /// Nothing matched the device name
    NoDevices,
    /// Host denied raw USB access (EX_NOPERM)
    PermissionDenied,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::DeviceFailed => 1,
            ExitStatus::NoDevices => 3,
            ExitStatus::PermissionDenied => 77,
        }
    }

    /// Translate a run result into an exit status.
    ///
    /// Permission problems take precedence over other failures since they
    /// usually apply to every device. With `allow_missing`, finding no device
    /// counts as success.
    pub fn from_run(result: &Result<Vec<DeviceOutcome>, RunError>, allow_missing: bool) -> Self {
        match result {
            Ok(outcomes) => {
                let mut status = ExitStatus::Success;
                for outcome in outcomes {
                    match &outcome.result {
                        ConfigurationResult::Failed(ApplyError::PermissionDenied) => {
                            return ExitStatus::PermissionDenied;
                        }
                        ConfigurationResult::Failed(_) => status = ExitStatus::DeviceFailed,
                        _ => {}
                    }
                }
                status
            }
            Err(RunError::NoDevicesFound { .. }) if allow_missing => ExitStatus::Success,
            Err(RunError::NoDevicesFound { .. }) => ExitStatus::NoDevices,
            Err(RunError::Enumeration(TransportError::PermissionDenied)) => {
                ExitStatus::PermissionDenied
            }
            Err(RunError::Enumeration(_)) => ExitStatus::DeviceFailed,
        }
    }
}

/// One device in the JSON report
#[derive(Debug, Serialize)]
struct ReportEntry {
    bus: u8,
    address: u8,
    previous_configuration: Option<u8>,
    desired_configuration: u8,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// One human-readable line per device
pub fn format_line(outcome: &DeviceOutcome, desired: u8) -> String {
    let transition = match outcome.previous_configuration {
        Some(previous) => format!("configuration {} -> {}", previous, desired),
        None => format!("configuration -> {}", desired),
    };

    match &outcome.result {
        ConfigurationResult::Unchanged => format!(
            "{}: configuration {} (unchanged)",
            outcome.identity,
            outcome.previous_configuration.unwrap_or(desired)
        ),
        ConfigurationResult::Applied => format!("{}: {} (applied)", outcome.identity, transition),
        ConfigurationResult::Failed(reason) => {
            format!("{}: {} failed: {}", outcome.identity, transition, reason)
        }
    }
}

/// Render all outcomes in the requested format
pub fn render(outcomes: &[DeviceOutcome], desired: u8, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => outcomes
            .iter()
            .map(|outcome| format_line(outcome, desired))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let entries: Vec<ReportEntry> = outcomes
                .iter()
                .map(|outcome| ReportEntry {
                    bus: outcome.identity.bus,
                    address: outcome.identity.address,
                    previous_configuration: outcome.previous_configuration,
                    desired_configuration: desired,
                    status: outcome.result.label(),
                    reason: match &outcome.result {
                        ConfigurationResult::Failed(reason) => Some(reason.to_string()),
                        _ => None,
                    },
                })
                .collect();
            // A Vec of plain structs cannot fail to serialize
            serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
        }
    }
}
