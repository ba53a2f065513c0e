//! epp2-serial - Serial protocol engine for the EPP-2 EPROM programmer
//!
//! This crate talks to an EPP-2 over a serial line.
//!
//! # Protocol Overview
//!
//! The EPP-2 speaks a line-oriented ASCII protocol. Every command is a
//! line closed by CR; the programmer echoes it, may print some text, and
//! ends with a `*` prompt once it is ready for the next command. A
//! rejected command is answered with exactly `Error\n`. The line is half
//! duplex: the host never sends before the previous reply is resolved.
//!
//! The programmer remembers its baud rate across power cycles, so every
//! session starts by finding the rate it listens at and switching it to
//! the configured one (see [`negotiate`]).
//!
//! # Layers
//!
//! - [`SerialTransport`]: the serial port itself
//! - [`CommandChannel`]: send a command, classify the reply
//! - [`BaudNegotiator`]: probe and switch the programmer's baud rate
//! - [`Session`]: setup, operation and status for one request
//!
//! # Example
//!
//! ```no_run
//! use epp2_core::{BaudRate, DeviceCode};
//! use epp2_serial::{open_session, NoProgress, Operation, Request, Timing};
//!
//! let mut session = open_session("/dev/ttyUSB0", BaudRate::B19200, Timing::default(), 5)?;
//! let request = Request {
//!     device: "1A2B3".parse::<DeviceCode>()?,
//!     operation: Operation::EmptyCheck { start: None, end: None },
//! };
//! let report = session.run(&request, &mut std::io::stdout(), &mut NoProgress)?;
//! println!("{}", report.status);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod channel;
pub mod controller;
pub mod error;
pub mod negotiate;
pub mod progress;
pub mod protocol;
pub mod transport;

// Re-exports
pub use channel::{Classification, CommandChannel, Response, Sink};
pub use controller::{Operation, OperationOutcome, Request, Session, SessionReport};
pub use error::{Result, SessionError};
pub use negotiate::{BaudNegotiator, Negotiation, NegotiationState};
pub use progress::{NoProgress, Progress};
pub use protocol::{Timing, DEFAULT_SYNC_ATTEMPTS};
pub use transport::SerialTransport;

use epp2_core::BaudRate;

/// Open a serial port and wrap it in a session that reports on stderr
///
/// The port is opened at `baud`; negotiation happens on the first
/// [`Session::run`].
pub fn open_session(
    path: &str,
    baud: BaudRate,
    timing: Timing,
    sync_attempts: u32,
) -> Result<Session<SerialTransport>> {
    let transport = SerialTransport::open(path, baud)?;
    let channel = CommandChannel::new(transport, std::io::stderr(), timing);
    Ok(Session::new(channel, baud, sync_attempts))
}
