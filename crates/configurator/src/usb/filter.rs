//! VID:PID device filters
//!
//! Filter format: `0xVID:0xPID`, with `*` as a wildcard on either side
//! (e.g. `0x0b95:0x1790`, `0x0b95:*`, `*:*`).

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("Invalid filter format '{0}', expected VID:PID (e.g., '0x0b95:0x1790' or '0x0b95:*')")]
    Format(String),

    #[error("Invalid {name} '{value}', must start with '0x' (e.g., '0x0b95')")]
    MissingPrefix { name: &'static str, value: String },

    #[error("Invalid {name} '{value}', hex part must be 1-4 digits")]
    Length { name: &'static str, value: String },

    #[error("Invalid {name} '{value}', not a valid hex number")]
    NotHex { name: &'static str, value: String },
}

/// One side of a filter: a specific ID or a wildcard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdPattern {
    Any,
    Exact(u16),
}

impl IdPattern {
    fn parse(value: &str, name: &'static str) -> Result<Self, FilterParseError> {
        if value == "*" {
            return Ok(IdPattern::Any);
        }

        let hex = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| FilterParseError::MissingPrefix {
                name,
                value: value.to_string(),
            })?;

        if hex.is_empty() || hex.len() > 4 {
            return Err(FilterParseError::Length {
                name,
                value: value.to_string(),
            });
        }

        u16::from_str_radix(hex, 16)
            .map(IdPattern::Exact)
            .map_err(|_| FilterParseError::NotHex {
                name,
                value: value.to_string(),
            })
    }

    fn matches(self, id: u16) -> bool {
        match self {
            IdPattern::Any => true,
            IdPattern::Exact(expected) => expected == id,
        }
    }
}

impl fmt::Display for IdPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdPattern::Any => write!(f, "*"),
            IdPattern::Exact(id) => write!(f, "0x{:04x}", id),
        }
    }
}

/// Vendor/product ID filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VidPidFilter {
    vendor: IdPattern,
    product: IdPattern,
}

impl VidPidFilter {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor.matches(vendor_id) && self.product.matches(product_id)
    }
}

impl FromStr for VidPidFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((vid, pid)) = s.split_once(':') else {
            return Err(FilterParseError::Format(s.to_string()));
        };
        if pid.contains(':') {
            return Err(FilterParseError::Format(s.to_string()));
        }

        Ok(Self {
            vendor: IdPattern::parse(vid, "VID")?,
            product: IdPattern::parse(pid, "PID")?,
        })
    }
}

impl fmt::Display for VidPidFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vendor, self.product)
    }
}

/// True if no filters are given or any filter matches
pub fn allowed_by(filters: &[VidPidFilter], vendor_id: u16, product_id: u16) -> bool {
    filters.is_empty() || filters.iter().any(|f| f.matches(vendor_id, product_id))
}

/// Parse a list of filter strings, failing on the first invalid one
pub fn parse_filters<S: AsRef<str>>(filters: &[S]) -> Result<Vec<VidPidFilter>, FilterParseError> {
    filters.iter().map(|f| f.as_ref().parse()).collect()
}
