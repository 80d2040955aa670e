//! Address parsing and formatting on the single linear integer axis.
//!
//! Both families live on a `u128` axis. IPv4 values are confined to the
//! lower 32-bit plane; anything larger is rejected at parse time.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};

/// A point on the address axis.
pub type Address = u128;

/// Which address plane a run operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum AddressFamily {
    #[value(name = "ipv4")]
    #[serde(rename = "ipv4")]
    V4,
    #[value(name = "ipv6")]
    #[serde(rename = "ipv6")]
    V6,
}

impl AddressFamily {
    /// Largest address representable in this family's plane.
    pub fn max_address(self) -> Address {
        match self {
            Self::V4 => u32::MAX as Address,
            Self::V6 => Address::MAX,
        }
    }

    fn check(self, value: Address, raw: &str) -> Result<Address> {
        if value > self.max_address() {
            return Err(Error::InvalidAddress(format!("{} is outside the {} plane", raw, self)));
        }
        Ok(value)
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "ipv4"),
            Self::V6 => write!(f, "ipv6"),
        }
    }
}

/// Parse a hexadecimal address (`0x` prefix optional).
pub fn parse_hex(field: &str, family: AddressFamily) -> Result<Address> {
    let trimmed = field.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let value = Address::from_str_radix(digits, 16)
        .map_err(|e| Error::InvalidAddress(format!("'{}': {}", field, e)))?;
    family.check(value, field)
}

/// Parse a textual address: dotted-quad, IPv6 notation, or a plain decimal integer.
pub fn parse_text(field: &str, family: AddressFamily) -> Result<Address> {
    let trimmed = field.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let value = trimmed
            .parse::<Address>()
            .map_err(|e| Error::InvalidAddress(format!("'{}': {}", field, e)))?;
        return family.check(value, field);
    }

    match family {
        AddressFamily::V4 => trimmed
            .parse::<Ipv4Addr>()
            .map(|ip| u32::from(ip) as Address)
            .map_err(|e| Error::InvalidAddress(format!("'{}': {}", field, e))),
        AddressFamily::V6 => trimmed
            .parse::<Ipv6Addr>()
            .map(u128::from)
            .map_err(|e| Error::InvalidAddress(format!("'{}': {}", field, e))),
    }
}

/// Render an address the way the merged table stores it: lowercase hex, no padding.
pub fn to_hex(addr: Address) -> String {
    format!("{:x}", addr)
}
