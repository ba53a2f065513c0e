//! EPP-2 command vocabulary and timing constants
//!
//! Commands are ASCII lines closed by CR. Numeric arguments are hex and
//! precede the command letter, e.g. `1A2B3S` or `8000P`.

use std::time::Duration;

/// Cancel the current command
pub const CANCEL: &str = "\x1B";
/// Query device code, start, end and offset addresses
pub const QUERY_RANGE: &str = "SPLO";
/// Empty check
pub const EMPTY_CHECK: &str = "T";
/// Read the address range
pub const READ: &str = "R";
/// Enter write mode
pub const WRITE: &str = "W";
/// Enter verify mode
pub const VERIFY: &str = "V";
/// Query status
pub const STATUS: &str = "G";
/// Offset used when no start address is given
pub const DEFAULT_OFFSET: &str = "0000O";

/// Set device code (`<hex>S`)
pub fn set_device(code: epp2_core::DeviceCode) -> String {
    format!("{}S", code)
}

/// Set start address (`<hex>P`)
pub fn set_start(addr: u16) -> String {
    format!("{:04X}P", addr)
}

/// Set program offset address (`<hex>O`)
pub fn set_offset(addr: u16) -> String {
    format!("{:04X}O", addr)
}

/// Set end address (`<hex>L`)
pub fn set_end(addr: u16) -> String {
    format!("{:04X}L", addr)
}

/// Last byte of a reply when the programmer is ready for a command
pub const PROMPT: u8 = b'*';
/// Whole reply sent for a rejected command
pub const ERROR_REPLY: &[u8] = b"Error\n";
/// Command line terminator
pub const CR: u8 = b'\r';
/// Escape byte, shown as `~` in diagnostics
pub const ESC: u8 = 0x1B;

/// Largest chunk read from the line in one poll
pub const CHUNK_LEN: usize = 255;

/// Poll budget while probing for the current baud rate
pub const PROBE_TICKS: u32 = 128;
/// Attempts per candidate baud rate
pub const PROBE_RETRIES: u32 = 4;
/// Poll budget for ordinary command replies
pub const REPLY_TICKS: u32 = 1024;
/// Poll budget for the data stream of a read
pub const READ_TICKS: u32 = 1024;
/// Poll budget after each record line of a write or verify
pub const LINE_TICKS: u32 = 8;
/// Replies polled while waiting for a prompt
pub const PROMPT_POLLS: u32 = 200;
/// Default bound on the outer negotiation loop
pub const DEFAULT_SYNC_ATTEMPTS: u32 = 5;

/// Delays used by the engine
///
/// `tick` separates empty polls, `settle` gives the programmer time to act
/// on a command such as a baud switch. Tests use [`Timing::instant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub tick: Duration,
    pub settle: Duration,
}

impl Timing {
    /// No delays at all
    pub const fn instant() -> Self {
        Self {
            tick: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1),
            settle: Duration::from_secs(1),
        }
    }
}
