//! Serial port transport
//!
//! The EPP-2 line discipline is fixed: 8 data bits, no parity, one stop
//! bit, RTS/CTS handshake, raw mode, no software flow control. Reads never
//! block; the channel does its own polling.

use std::io::{Read, Write};
use std::time::Duration;

use epp2_core::{BaudRate, Transport};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::{Result, SessionError};

/// Serial port connected to an EPP-2
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    path: String,
    baud: BaudRate,
}

impl SerialTransport {
    /// Open and configure a serial port at the given baud rate
    pub fn open(path: &str, baud: BaudRate) -> Result<Self> {
        let port = serialport::new(path, baud.bits_per_second())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::Hardware)
            .timeout(Duration::ZERO)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::InvalidInput => SessionError::ConfigFailure {
                    path: path.to_string(),
                    reason: e.to_string(),
                },
                _ => SessionError::OpenFailure {
                    path: path.to_string(),
                    source: e,
                },
            })?;

        log::info!("Opened serial port {} at {} baud", path, baud);

        Ok(Self {
            port,
            path: path.to_string(),
            baud,
        })
    }

    /// Device node this transport was opened on
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> epp2_core::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> epp2_core::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn set_baud(&mut self, baud: BaudRate) -> epp2_core::Result<()> {
        self.port
            .set_baud_rate(baud.bits_per_second())
            .map_err(|e| epp2_core::Error::LineConfig(format!("{}: {}", self.path, e)))?;
        log::debug!("{}: local baud rate {}", self.path, baud);
        self.baud = baud;
        Ok(())
    }

    fn baud(&self) -> BaudRate {
        self.baud
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        log::debug!("Closing serial port {}", self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_port_is_open_failure() {
        let path = "/nonexistent/epp2/ttyUSB9";
        let err = match SerialTransport::open(path, BaudRate::B19200) {
            Err(e) => e,
            Ok(_) => panic!("opened {}", path),
        };
        assert!(
            matches!(err, SessionError::OpenFailure { path: ref p, .. } if p == path),
            "{:?}",
            err
        );
        assert!(err.to_string().contains(path));
    }
}
