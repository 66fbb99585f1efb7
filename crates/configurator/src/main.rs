//! usb-configurator
//!
//! Switches matching USB devices into a working configuration. Intended to be
//! run by hand or re-run periodically by an external job scheduler.

use anyhow::{Context, Result};
use clap::Parser;
use common::bus::UsbBus;
use common::{RunError, setup_logging};
use configurator::config::{self, ConfiguratorConfig, Overrides};
use configurator::report::{ExitStatus, OutputFormat, render};
use configurator::runner::run;
use configurator::usb::RusbBus;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "usb-configurator")]
#[command(
    author,
    version,
    about = "Switch USB devices matched by product name into a given configuration"
)]
#[command(long_about = "
Finds every USB device whose product string contains DEVICE_NAME and sets its
active configuration to CONFIG_VALUE. Devices already in that configuration are
left untouched, so the tool is safe to re-run after every hotplug.

EXAMPLES:
    # Switch every AX88179A adapter to configuration 2
    usb-configurator

    # Switch a different device to configuration 1
    usb-configurator \"My Adapter\" 1

    # Show product strings of all attached devices
    usb-configurator --list-devices

    # Only touch ASIX devices, report as JSON
    usb-configurator --filter 0x0b95:* --format json

CONFIGURATION:
    Settings are read from the first of:
    1. Path specified with --config
    2. ~/.config/usb-configurator/config.toml
    3. /etc/usb-configurator/config.toml
    4. Built-in defaults
    Command-line arguments override the configuration file.

EXIT STATUS:
    0   every matching device is in the requested configuration
    1   at least one device failed
    3   no matching device was found (0 with --allow-missing)
    77  access to a device was denied
")]
struct Args {
    /// Substring of the USB product string to match [default: AX88179A]
    device_name: Option<String>,

    /// Configuration value to set [default: 2]
    #[arg(value_parser = clap::value_parser!(u8).range(1..))]
    config_value: Option<u8>,

    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Output format for per-device results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Exit successfully when no matching device is found
    #[arg(long)]
    allow_missing: bool,

    /// Only consider devices matching VID:PID (repeatable, e.g. 0x0b95:*)
    #[arg(long = "filter", value_name = "VID:PID")]
    filters: Vec<String>,

    /// Timeout for descriptor reads in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = ConfiguratorConfig::default();
        let path = ConfiguratorConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration first (to get log level from config if not specified)
    let config = match args.config.as_deref() {
        Some(path) => config::load_config(path).context("Failed to load configuration")?,
        None => ConfiguratorConfig::load_or_default().context("Failed to load configuration")?,
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);

    setup_logging(log_level).context("Failed to setup logging")?;

    info!("usb-configurator v{}", env!("CARGO_PKG_VERSION"));

    if args.device_name.is_none() {
        info!("Using device name '{}'", config.device.name);
    }
    let config = merge_args(&args, config)?;

    let bus = RusbBus::new(config.usb.timeout()).context("Failed to initialise libusb")?;

    if args.list_devices {
        list_devices_mode(&bus, args.format)?;
        return Ok(ExitCode::SUCCESS);
    }

    let options = config.run_options()?;
    let allow_missing = config.general.allow_missing;

    let result = run(&bus, &options);

    match &result {
        Ok(outcomes) => println!(
            "{}",
            render(outcomes, options.desired_configuration, args.format)
        ),
        Err(RunError::NoDevicesFound { .. }) => {
            if args.format == OutputFormat::Json {
                println!("[]");
            } else {
                println!("No USB devices matching '{}' found.", options.device_name);
            }
        }
        Err(e @ RunError::Enumeration(_)) => error!("{}", e),
    }

    let status = ExitStatus::from_run(&result, allow_missing);
    if status == ExitStatus::PermissionDenied {
        warn!("Access to USB devices was denied; run with elevated privileges or add a udev rule");
    }

    Ok(ExitCode::from(status.code()))
}

/// Merge command-line arguments over the configuration file
fn merge_args(args: &Args, config: ConfiguratorConfig) -> Result<ConfiguratorConfig> {
    config
        .with_overrides(Overrides {
            device_name: args.device_name.clone(),
            configuration: args.config_value,
            filters: args.filters.clone(),
            timeout_ms: args.timeout_ms,
            allow_missing: args.allow_missing,
        })
        .context("Invalid command-line arguments")
}

/// List USB devices and exit
fn list_devices_mode(bus: &RusbBus, format: OutputFormat) -> Result<()> {
    info!("Listing USB devices...");

    let devices = bus.enumerate().context("Failed to enumerate USB devices")?;

    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&devices).context("Failed to serialize device list")?
        );
        return Ok(());
    }

    if devices.is_empty() {
        println!("No USB devices found.");
        return Ok(());
    }

    println!("Found {} USB device(s):\n", devices.len());
    for device in devices {
        println!(
            "  {} {:04x}:{:04x} - {}",
            device.identity,
            device.vendor_id,
            device.product_id,
            device.product.as_deref().unwrap_or("Unknown Product")
        );
        println!("      Active configuration: {}", device.active_configuration);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("usb-configurator").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults_come_from_config() {
        let config = merge_args(&parse(&[]), ConfiguratorConfig::default()).unwrap();
        let options = config.run_options().unwrap();

        assert_eq!(options.device_name, "AX88179A");
        assert_eq!(options.desired_configuration, 2);
        assert!(options.filters.is_empty());
        assert!(!config.general.allow_missing);
    }

    #[test]
    fn test_args_override_config() {
        let args = parse(&[
            "My Adapter",
            "1",
            "--filter",
            "0x0b95:*",
            "--timeout-ms",
            "250",
            "--allow-missing",
        ]);
        let config = merge_args(&args, ConfiguratorConfig::default()).unwrap();
        let options = config.run_options().unwrap();

        assert_eq!(options.device_name, "My Adapter");
        assert_eq!(options.desired_configuration, 1);
        assert_eq!(options.filters.len(), 1);
        assert_eq!(config.usb.timeout_ms, 250);
        assert!(config.general.allow_missing);
    }

    #[test]
    fn test_empty_device_name_rejected() {
        // An empty fragment would match every readable device on the bus
        let result = merge_args(&parse(&[""]), ConfiguratorConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Args::try_parse_from(["usb-configurator", "--timeout-ms", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_configuration_rejected() {
        let result = Args::try_parse_from(["usb-configurator", "AX88179A", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let args = parse(&["--filter", "0b95:1790"]);
        let message = format!(
            "{:#}",
            merge_args(&args, ConfiguratorConfig::default()).unwrap_err()
        );
        assert!(message.contains("must start with '0x'"), "{}", message);
    }
}
