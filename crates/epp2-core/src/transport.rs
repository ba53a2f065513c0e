//! Transport trait for the programmer's serial line
//!
//! The protocol engine only needs four things from the line: write
//! bytes, poll for bytes without blocking, change the local baud rate, and
//! report which rate is currently applied. Real hardware implements this
//! over a serial port; tests use an in-memory emulator.

use crate::baud::BaudRate;
use crate::error::Result;

/// Byte transport to an EPP-2 programmer
pub trait Transport {
    /// Write all bytes to the line
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever is available without waiting
    ///
    /// Returns the number of bytes placed in `buf`, or 0 if nothing was
    /// pending.
    fn read_nonblock(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reconfigure the local side of the line to a new baud rate
    fn set_baud(&mut self, baud: BaudRate) -> Result<()>;

    /// The baud rate currently applied locally
    fn baud(&self) -> BaudRate;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_nonblock(buf)
    }

    fn set_baud(&mut self, baud: BaudRate) -> Result<()> {
        (**self).set_baud(baud)
    }

    fn baud(&self) -> BaudRate {
        (**self).baud()
    }
}
