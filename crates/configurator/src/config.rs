//! Configurator configuration management

use crate::runner::{DEFAULT_CONFIGURATION, DEFAULT_DEVICE_NAME, RunOptions};
use crate::usb::VidPidFilter;
use crate::usb::device::DEFAULT_TIMEOUT;
use crate::usb::filter::parse_filters;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// System-wide configuration file location
const SYSTEM_CONFIG_PATH: &str = "/etc/usb-configurator/config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfiguratorConfig {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub usb: UsbSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default = "GeneralSettings::default_log_level")]
    pub log_level: String,
    /// Exit successfully when no device matches
    #[serde(default)]
    pub allow_missing: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            allow_missing: false,
        }
    }
}

impl GeneralSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

/// Which devices to configure, and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Substring of the USB product string
    #[serde(default = "DeviceSettings::default_name")]
    pub name: String,
    /// `bConfigurationValue` to switch to
    #[serde(default = "DeviceSettings::default_configuration")]
    pub configuration: u8,
    /// Optional VID:PID filters, e.g. "0x0b95:0x1790" or "0x0b95:*"
    #[serde(default)]
    pub filters: Vec<String>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            configuration: Self::default_configuration(),
            filters: Vec::new(),
        }
    }
}

impl DeviceSettings {
    fn default_name() -> String {
        DEFAULT_DEVICE_NAME.to_string()
    }

    fn default_configuration() -> u8 {
        DEFAULT_CONFIGURATION
    }

    /// Parsed form of `filters`
    pub fn parsed_filters(&self) -> Result<Vec<VidPidFilter>> {
        parse_filters(self.filters.as_slice()).map_err(|e| anyhow!(e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Timeout for descriptor string control transfers, in milliseconds
    #[serde(default = "UsbSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl UsbSettings {
    fn default_timeout_ms() -> u64 {
        DEFAULT_TIMEOUT.as_millis() as u64
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub device_name: Option<String>,
    pub configuration: Option<u8>,
    pub filters: Vec<String>,
    pub timeout_ms: Option<u64>,
    pub allow_missing: bool,
}

impl ConfiguratorConfig {
    /// Load configuration from the specified path, or the first standard
    /// location that exists
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file().ok_or_else(|| anyhow!("No configuration file found"))?,
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        tracing::debug!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: ConfiguratorConfig =
            toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a standard location, or use defaults if none exists
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load(Some(path)),
            None => Ok(Self::default()),
        }
    }

    /// Standard locations, in order of precedence
    fn find_config_file() -> Option<PathBuf> {
        [Self::default_path(), PathBuf::from(SYSTEM_CONFIG_PATH)]
            .into_iter()
            .find(|p| p.exists())
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-configurator").join("config.toml")
        } else {
            PathBuf::from(".config/usb-configurator/config.toml")
        }
    }

    /// Apply command-line overrides, then validate the merged settings
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(name) = overrides.device_name {
            self.device.name = name;
        }
        if let Some(configuration) = overrides.configuration {
            self.device.configuration = configuration;
        }
        if !overrides.filters.is_empty() {
            self.device.filters = overrides.filters;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.usb.timeout_ms = timeout_ms;
        }
        self.general.allow_missing |= overrides.allow_missing;

        self.validate()?;
        Ok(self)
    }

    /// Options for a single scan-and-fix pass
    pub fn run_options(&self) -> Result<RunOptions> {
        Ok(RunOptions {
            device_name: self.device.name.clone(),
            desired_configuration: self.device.configuration,
            filters: self.device.parsed_filters()?,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.device.name.is_empty() {
            return Err(anyhow!("Device name must not be empty"));
        }

        // 0 would put the device in the unconfigured state
        if self.device.configuration == 0 {
            return Err(anyhow!("Configuration value must be between 1 and 255"));
        }

        if self.usb.timeout_ms == 0 {
            return Err(anyhow!("USB timeout must be greater than 0"));
        }

        self.device.parsed_filters()?;

        Ok(())
    }
}

/// Load configuration from a user-supplied path, expanding `~`
pub fn load_config(path: &str) -> Result<ConfiguratorConfig> {
    let path_buf = PathBuf::from(shellexpand::tilde(path).as_ref());
    ConfiguratorConfig::load(Some(path_buf))
}
