//! Motorola S-record text format
//!
//! The programmer takes data to write or verify as S-record lines. This
//! module converts binary data into `S3` data records (32-bit address, up
//! to 32 data bytes each) closed by an `S7` terminator, and parses record
//! lines back into address and data.
//!
//! Every record carries a checksum: the one's complement of the low byte
//! of the sum of the length byte, each address byte and each data byte.

use core::fmt::Write as _;
use std::io::{self, Write};

use crate::error::{Error, Result};

/// Data bytes per generated record
pub const RECORD_DATA_LEN: usize = 32;

/// Longest record line accepted, excluding the line terminator
pub const MAX_LINE_LEN: usize = 255;

/// Record checksum over the length byte, the address bytes and the data
pub fn checksum(len: u8, address: &[u8], data: &[u8]) -> u8 {
    let sum = address
        .iter()
        .chain(data)
        .fold(len, |acc, &b| acc.wrapping_add(b));
    !sum
}

/// Format an `S3` data record (no line terminator)
pub fn data_record(address: u32, data: &[u8]) -> Result<String> {
    if data.len() > RECORD_DATA_LEN {
        return Err(Error::CapacityExceeded {
            capacity: RECORD_DATA_LEN,
        });
    }

    let len = (4 + data.len() + 1) as u8;
    let addr = address.to_be_bytes();
    let mut line = String::with_capacity(12 + data.len() * 2 + 2);
    // Writing to a String cannot fail
    let _ = write!(line, "S3{:02X}{:08X}", len, address);
    for b in data {
        let _ = write!(line, "{:02X}", b);
    }
    let _ = write!(line, "{:02X}", checksum(len, &addr, data));
    Ok(line)
}

/// Format an `S7` terminator record (no line terminator)
pub fn terminator_record(address: u32) -> String {
    let len = 5u8;
    let addr = address.to_be_bytes();
    format!("S7{:02X}{:08X}{:02X}", len, address, checksum(len, &addr, &[]))
}

/// Outcome of a binary to S-record conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertStats {
    /// Number of data records written
    pub records: usize,
    /// Number of data bytes converted
    pub bytes: usize,
    /// Address given in the terminator record
    pub last_address: u32,
}

/// Convert binary data to S-record lines
///
/// Data starts at `start` and no byte is placed beyond the inclusive
/// `max_address`; input past that point is dropped. The terminator
/// carries the address of the last byte emitted, or `start` when nothing
/// was emitted.
pub fn convert<W: Write>(
    out: &mut W,
    data: &[u8],
    start: u32,
    max_address: u32,
) -> io::Result<ConvertStats> {
    let mut stats = ConvertStats {
        records: 0,
        bytes: 0,
        last_address: start,
    };

    let mut address = start as u64;
    let mut remaining = data;
    while !remaining.is_empty() && address <= max_address as u64 {
        let room = (max_address as u64 - address + 1).min(RECORD_DATA_LEN as u64) as usize;
        let count = remaining.len().min(room);
        let (chunk, rest) = remaining.split_at(count);

        let line = data_record(address as u32, chunk)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        write!(out, "{}\r\n", line)?;

        stats.records += 1;
        stats.bytes += count;
        stats.last_address = (address + count as u64 - 1) as u32;
        address += count as u64;
        remaining = rest;
    }

    write!(out, "{}\r\n", terminator_record(stats.last_address))?;
    Ok(stats)
}

/// Kind of a parsed record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Header record (S0)
    Header,
    /// Data record (S1, S2, S3)
    Data,
    /// Record count (S5, S6)
    Count,
    /// Termination record (S7, S8, S9)
    Terminator,
}

/// A parsed and checksum-validated record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    pub address: u32,
    pub data: Vec<u8>,
}

impl Record {
    /// Parse one record line; trailing CR/LF is ignored
    pub fn parse(line: &str) -> core::result::Result<Self, RecordError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.len() > MAX_LINE_LEN {
            return Err(RecordError::TooLong);
        }

        let bytes = line.as_bytes();
        if bytes.len() < 4 || bytes[0] != b'S' {
            return Err(RecordError::Malformed);
        }

        let (kind, addr_len) = match bytes[1] {
            b'0' => (RecordKind::Header, 2),
            b'1' => (RecordKind::Data, 2),
            b'2' => (RecordKind::Data, 3),
            b'3' => (RecordKind::Data, 4),
            b'5' => (RecordKind::Count, 2),
            b'6' => (RecordKind::Count, 3),
            b'7' => (RecordKind::Terminator, 4),
            b'8' => (RecordKind::Terminator, 3),
            b'9' => (RecordKind::Terminator, 2),
            _ => return Err(RecordError::Malformed),
        };

        let body = decode_hex(&line[2..]).ok_or(RecordError::Malformed)?;
        let len = body[0] as usize;
        if body.len() != len + 1 || len < addr_len + 1 {
            return Err(RecordError::Malformed);
        }

        let address_bytes = &body[1..1 + addr_len];
        let data = &body[1 + addr_len..len];
        let expected = body[len];
        if checksum(body[0], address_bytes, data) != expected {
            return Err(RecordError::Checksum);
        }

        let address = address_bytes
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);

        Ok(Self {
            kind,
            address,
            data: data.to_vec(),
        })
    }
}

/// Why a record line was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Not a well-formed S-record
    Malformed,
    /// Checksum mismatch
    Checksum,
    /// Longer than [`MAX_LINE_LEN`]
    TooLong,
}

impl core::fmt::Display for RecordError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed record"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::TooLong => write!(f, "record longer than {} characters", MAX_LINE_LEN),
        }
    }
}

impl std::error::Error for RecordError {}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}
