//! epp2-core - Core types for the EPP-2 EPROM programmer
//!
//! This crate holds everything that does not need a serial line:
//!
//! - [`BaudRate`] and the remote baud-switch command table
//! - [`AddressRange`] and hex address parsing
//! - [`OperationKind`], the set of things the application can do
//! - [`device`]: device codes, their decoded programming specification,
//!   and the RON device database used for searching
//! - [`srec`]: Motorola S-record generation from binary data
//! - [`image`]: fixed-size 64 KiB ROM image assembly
//! - [`transport::Transport`], the byte-level seam the protocol engine
//!   is written against

pub mod address;
pub mod baud;
pub mod device;
pub mod error;
pub mod image;
pub mod operation;
pub mod srec;
pub mod transport;

// Re-exports
pub use address::{parse_hex_u16, AddressRange, MAX_ADDRESS};
pub use baud::BaudRate;
pub use device::{DeviceCode, DeviceSpec};
pub use error::{Error, Result};
pub use operation::OperationKind;
pub use transport::Transport;
