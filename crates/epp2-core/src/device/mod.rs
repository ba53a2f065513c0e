//! Device codes and the device database
//!
//! A device code is a 24-bit value that tells the EPP-2 how to program a
//! part: memory size, pin layout, voltages, pulse width and algorithm are
//! packed into bit fields. The programmer takes the code as hex text
//! followed by `S`.

mod database;

pub use database::{DeviceDatabase, DeviceEntry};

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};

/// Widest value a device code can hold
pub const MAX_DEVICE_CODE: u32 = 0xFF_FFFF;

/// A programmer device code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCode(u32);

impl DeviceCode {
    /// Create a device code, rejecting values wider than 24 bits
    pub fn new(value: u32) -> Result<Self> {
        if value > MAX_DEVICE_CODE {
            return Err(Error::InvalidDeviceCode(format!("{:X}", value)));
        }
        Ok(Self(value))
    }

    /// Raw 24-bit value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Decode the bit fields
    pub fn spec(self) -> DeviceSpec {
        DeviceSpec::decode(self)
    }
}

impl FromStr for DeviceCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let value =
            u32::from_str_radix(digits, 16).map_err(|_| Error::InvalidDeviceCode(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

/// Programming parameters packed into a [`DeviceCode`]
///
/// Each field holds the raw index the programmer uses for that parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Memory size index (bits 0-3)
    pub size: u8,
    /// Pin configuration index (bits 4-6)
    pub pin_config: u8,
    /// Skip programming of 0xFF bytes (bit 7)
    pub ff_skip: bool,
    /// Programming voltage index (bits 8-11)
    pub vpp: u8,
    /// Supply voltage index (bits 12-13)
    pub vcc: u8,
    /// Margin factor index (bits 14-15)
    pub margin_factor: u8,
    /// Programming pulse time index (bits 16-19)
    pub pulse_time: u8,
    /// Programming algorithm index (bits 20-21)
    pub algorithm: u8,
}

impl DeviceSpec {
    /// Split a device code into its fields
    pub fn decode(code: DeviceCode) -> Self {
        let v = code.value();
        let field = |shift: u32, mask: u32| ((v >> shift) & mask) as u8;
        Self {
            size: field(0, 0x0F),
            pin_config: field(4, 0x07),
            ff_skip: field(7, 0x01) != 0,
            vpp: field(8, 0x0F),
            vcc: field(12, 0x03),
            margin_factor: field(14, 0x03),
            pulse_time: field(16, 0x0F),
            algorithm: field(20, 0x03),
        }
    }

    /// Pack the fields back into a device code
    pub fn encode(&self) -> DeviceCode {
        let v = (self.size as u32 & 0x0F)
            | ((self.pin_config as u32 & 0x07) << 4)
            | ((self.ff_skip as u32) << 7)
            | ((self.vpp as u32 & 0x0F) << 8)
            | ((self.vcc as u32 & 0x03) << 12)
            | ((self.margin_factor as u32 & 0x03) << 14)
            | ((self.pulse_time as u32 & 0x0F) << 16)
            | ((self.algorithm as u32 & 0x03) << 20);
        DeviceCode(v)
    }
}
