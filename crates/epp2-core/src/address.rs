//! Device address handling
//!
//! The EPP-2 addresses at most 64 KiB, so every address is a `u16`. Values
//! given on the command line are hexadecimal, like the device expects.

use core::fmt;

use crate::error::{Error, Result};

/// Highest address the programmer can reach
pub const MAX_ADDRESS: u16 = 0xFFFF;

/// Parse a hexadecimal address, with or without a `0x` prefix
///
/// Values above [`MAX_ADDRESS`] are clamped rather than rejected, so an
/// end address such as `10000` means "to the top of the device".
pub fn parse_hex_u16(s: &str) -> Result<u16> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(Error::InvalidAddress(s.to_string()));
    }
    // Saturate while accumulating so any number of digits clamps
    let value = digits
        .chars()
        .try_fold(0u32, |acc, c| {
            let digit = c.to_digit(16)?;
            Some((acc * 16 + digit).min(MAX_ADDRESS as u32 + 1))
        })
        .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
    Ok(value.min(MAX_ADDRESS as u32) as u16)
}

/// An inclusive address range with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    start: u16,
    end: u16,
}

impl AddressRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole 64 KiB address space
    pub const fn full() -> Self {
        Self {
            start: 0,
            end: MAX_ADDRESS,
        }
    }

    /// First address in the range
    pub const fn start(&self) -> u16 {
        self.start
    }

    /// Last address in the range (inclusive)
    pub const fn end(&self) -> u16 {
        self.end
    }

    /// Number of bytes covered
    pub const fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// A range always covers at least one byte
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Check whether an address lies inside the range
    pub const fn contains(&self, addr: u16) -> bool {
        addr >= self.start && addr <= self.end
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} - {:04X}", self.start, self.end)
    }
}
