//! Error types for epp2-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Baud rate is not one the EPP-2 supports
    #[error("invalid baud rate for EPP-2 programmer: {0}")]
    InvalidBaudRate(String),

    /// Address could not be parsed as hexadecimal
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Start address lies after end address
    #[error("invalid address range: 0x{start:04X} - 0x{end:04X}")]
    InvalidRange { start: u16, end: u16 },

    /// Device code could not be parsed or is wider than 24 bits
    #[error("invalid device code: {0}")]
    InvalidDeviceCode(String),

    /// A bounded buffer would have overflowed
    #[error("capacity of {capacity} bytes exceeded")]
    CapacityExceeded { capacity: usize },

    /// Device database file could not be parsed
    #[error("device database parse error: {0}")]
    DeviceDb(#[from] ron::error::SpannedError),

    /// I/O error (files or transport)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local line discipline or baud rate could not be applied
    #[error("serial line configuration failed: {0}")]
    LineConfig(String),
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
