//! Baud rates understood by the EPP-2
//!
//! The programmer powers up at one of a fixed set of rates and can be
//! switched to another with a two-character command. The order of
//! [`BaudRate::ALL`] is the probe order used when the current rate is
//! unknown, so it must stay ascending.

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};

/// A supported serial line speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaudRate {
    B300,
    B600,
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
}

impl BaudRate {
    /// Every supported rate, in probe order
    pub const ALL: [BaudRate; 7] = [
        BaudRate::B300,
        BaudRate::B600,
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
    ];

    /// Line speed in bits per second
    pub const fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B300 => 300,
            BaudRate::B600 => 600,
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
        }
    }

    /// Command (without CR) that makes the programmer switch to this rate
    pub const fn switch_command(self) -> &'static str {
        match self {
            BaudRate::B300 => "6X",
            BaudRate::B600 => "5X",
            BaudRate::B1200 => "4X",
            BaudRate::B2400 => "3X",
            BaudRate::B4800 => "2X",
            BaudRate::B9600 => "1X",
            BaudRate::B19200 => "0X",
        }
    }

    /// Look up a rate by its numeric value
    pub fn from_bits_per_second(bps: u32) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.bits_per_second() == bps)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

impl FromStr for BaudRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_bits_per_second)
            .ok_or_else(|| Error::InvalidBaudRate(s.to_string()))
    }
}
