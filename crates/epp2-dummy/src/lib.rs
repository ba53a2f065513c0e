//! epp2-dummy - In-memory EPP-2 programmer emulator
//!
//! This crate provides a [`Transport`] that behaves like an EPP-2 on the
//! other end of a serial line. It holds a 64 KiB memory, understands the
//! command vocabulary, answers with echoes and `*` prompts, and only hears
//! the host when both sides use the same baud rate. It's useful for
//! testing and development without real hardware.

use std::collections::VecDeque;

use epp2_core::image::{ERASED, ROM_SIZE};
use epp2_core::srec::{self, Record, RecordKind};
use epp2_core::{BaudRate, Result, Transport};

/// Configuration for the emulated programmer
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Baud rate the programmer is listening at
    pub baud: BaudRate,
    /// Echo each command line before the reply
    pub echo: bool,
    /// Command letters answered with `Error` (e.g. `"L"`)
    pub reject_commands: String,
    /// 1-based record line rejected during write or verify
    pub reject_record: Option<usize>,
    /// Never answer anything
    pub mute: bool,
    /// Command letters carried out without any reply; the bare CR that
    /// follows gets no prompt either
    pub unanswered: String,
    /// Deliver at most this many bytes per read
    pub max_read: Option<usize>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            baud: BaudRate::B9600,
            echo: true,
            reject_commands: String::new(),
            reject_record: None,
            mute: false,
            unanswered: String::new(),
            max_read: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Command,
    Write,
    Verify,
}

/// Emulated EPP-2 programmer
pub struct DummyProgrammer {
    config: DummyConfig,
    host_baud: BaudRate,
    device_baud: BaudRate,
    line: Vec<u8>,
    outgoing: VecDeque<Vec<u8>>,
    memory: Vec<u8>,
    device_code: u32,
    start: u16,
    end: u16,
    offset: u16,
    mode: Mode,
    records: usize,
    status: String,
    quiet: bool,
    commands: Vec<String>,
    baud_changes: Vec<BaudRate>,
}

impl DummyProgrammer {
    /// Create an emulator; `host_baud` is the rate the host side starts at
    pub fn new(config: DummyConfig, host_baud: BaudRate) -> Self {
        Self {
            device_baud: config.baud,
            config,
            host_baud,
            line: Vec::new(),
            outgoing: VecDeque::new(),
            memory: vec![ERASED; ROM_SIZE],
            device_code: 0,
            start: 0,
            end: 0xFFFF,
            offset: 0,
            mode: Mode::Command,
            records: 0,
            status: "READY".to_string(),
            quiet: false,
            commands: Vec::new(),
            baud_changes: Vec::new(),
        }
    }

    /// Emulator listening at `baud`, host starting at the same rate
    pub fn at(baud: BaudRate) -> Self {
        Self::new(
            DummyConfig {
                baud,
                ..Default::default()
            },
            baud,
        )
    }

    /// Every command line the programmer received, in order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Every local baud change requested by the host, in order
    pub fn baud_changes(&self) -> &[BaudRate] {
        &self.baud_changes
    }

    /// Rate the programmer is currently listening at
    pub fn device_baud(&self) -> BaudRate {
        self.device_baud
    }

    /// Programmer memory
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Preload programmer memory
    pub fn load_memory(&mut self, addr: u16, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.memory[(addr as usize + i) % ROM_SIZE] = b;
        }
    }

    /// Last device code set by the host
    pub fn device_code(&self) -> u32 {
        self.device_code
    }

    /// Current start, end and offset addresses
    pub fn addresses(&self) -> (u16, u16, u16) {
        (self.start, self.end, self.offset)
    }

    /// Text the programmer reports for the status command
    pub fn status(&self) -> &str {
        &self.status
    }

    fn queue(&mut self, packet: impl Into<Vec<u8>>) {
        if !self.config.mute && !self.quiet {
            self.outgoing.push_back(packet.into());
        }
    }

    fn prompt(&mut self) {
        self.queue(b"*".to_vec());
    }

    fn error(&mut self) {
        self.queue(b"Error\n".to_vec());
        self.prompt();
    }

    fn echo(&mut self, line: &str, body: &str) {
        let mut packet = String::new();
        if self.config.echo {
            packet.push_str(line);
            packet.push('\r');
        }
        packet.push('\n');
        if !body.is_empty() {
            packet.push_str(body);
            packet.push('\n');
        }
        self.queue(packet.into_bytes());
    }

    fn receive_byte(&mut self, byte: u8) {
        match byte {
            b'\r' => {
                let line = String::from_utf8_lossy(&self.line).into_owned();
                self.line.clear();
                log::trace!("dummy: received {:?}", line);
                self.commands.push(line.clone());
                self.handle_line(&line);
            }
            b'\n' => {}
            _ => self.line.push(byte),
        }
    }

    fn handle_line(&mut self, line: &str) {
        if line.starts_with('\x1B') {
            self.mode = Mode::Command;
            self.quiet = false;
            self.queue(b"\r\n*".to_vec());
            return;
        }

        match self.mode {
            Mode::Write | Mode::Verify if line.starts_with('S') => self.handle_record(line),
            Mode::Write | Mode::Verify => {
                self.mode = Mode::Command;
                self.queue(b"\r\n*".to_vec());
            }
            Mode::Command => self.handle_command(line),
        }
    }

    fn handle_command(&mut self, line: &str) {
        if line.is_empty() {
            self.queue(b"\r\n*".to_vec());
            return;
        }
        self.quiet = line
            .chars()
            .last()
            .is_some_and(|letter| self.config.unanswered.contains(letter));

        if line == "SPLO" {
            let body = format!(
                "{:06X} {:04X} {:04X} {:04X}",
                self.device_code, self.start, self.end, self.offset
            );
            self.echo(line, &body);
            self.prompt();
            return;
        }

        if !line.is_ascii() {
            self.error();
            return;
        }

        let (arg, letter) = line.split_at(line.len() - 1);
        if self.config.reject_commands.contains(letter) {
            self.error();
            return;
        }

        let value = if arg.is_empty() {
            None
        } else {
            match u32::from_str_radix(arg, 16) {
                Ok(v) => Some(v),
                Err(_) => {
                    self.error();
                    return;
                }
            }
        };

        match (letter, value) {
            ("S", Some(v)) if v <= 0xFF_FFFF => self.device_code = v,
            ("P", Some(v)) if v <= 0xFFFF => self.start = v as u16,
            ("O", Some(v)) if v <= 0xFFFF => self.offset = v as u16,
            ("L", Some(v)) if v <= 0xFFFF => self.end = v as u16,
            ("X", Some(v)) if v <= 6 => {
                // The switch takes effect before any reply could be heard
                let rate = BaudRate::ALL[6 - v as usize];
                log::debug!("dummy: switching to {} baud", rate);
                self.device_baud = rate;
                return;
            }
            ("T", None) => self.empty_check(),
            ("R", None) => {
                self.echo(line, "");
                self.stream_memory();
                self.prompt();
                return;
            }
            ("W", None) | ("V", None) => {
                self.mode = if letter == "W" {
                    Mode::Write
                } else {
                    Mode::Verify
                };
                self.records = 0;
                self.status = if letter == "W" { "WRITE OK" } else { "VERIFY OK" }.to_string();
                self.echo(line, "");
                return;
            }
            ("G", None) => {
                let status = self.status.clone();
                self.echo(line, &status);
                self.prompt();
                return;
            }
            _ => {
                self.error();
                return;
            }
        }

        self.echo(line, "");
        self.prompt();
    }

    fn empty_check(&mut self) {
        let range = self.start as usize..=self.end as usize;
        self.status = match self.memory[range.clone()].iter().position(|&b| b != ERASED) {
            Some(i) => format!("NOT EMPTY AT {:04X}", range.start() + i),
            None => "EMPTY".to_string(),
        };
    }

    fn stream_memory(&mut self) {
        if self.start > self.end {
            return;
        }
        let (start, end) = (self.start as usize, self.end as usize);
        let mut addr = start;
        while addr <= end {
            let count = (end - addr + 1).min(srec::RECORD_DATA_LEN);
            let chunk = self.memory[addr..addr + count].to_vec();
            if let Ok(record) = srec::data_record(addr as u32, &chunk) {
                self.queue(format!("{}\r\n", record).into_bytes());
            }
            addr += count;
        }
    }

    fn handle_record(&mut self, line: &str) {
        self.records += 1;
        if self.config.reject_record == Some(self.records) {
            self.status = format!("LINE ERROR {}", self.records);
            self.queue(format!("LINE ERROR {}\n", self.records).into_bytes());
            return;
        }

        let record = match Record::parse(line) {
            Ok(record) => record,
            Err(e) => {
                self.status = format!("RECORD ERROR {}", self.records);
                self.queue(format!("RECORD ERROR {}: {}\n", self.records, e).into_bytes());
                return;
            }
        };

        match record.kind {
            RecordKind::Data => {
                let base = (record.address as u16)
                    .wrapping_sub(self.offset)
                    .wrapping_add(self.start);
                for (i, &b) in record.data.iter().enumerate() {
                    let addr = base.wrapping_add(i as u16);
                    let slot = &mut self.memory[addr as usize];
                    if self.mode == Mode::Write {
                        *slot = b;
                    } else if *slot != b {
                        self.status = format!("VERIFY ERROR AT {:04X}", addr);
                        self.queue(format!("VERIFY ERROR {:04X}\n", addr).into_bytes());
                        return;
                    }
                }
            }
            RecordKind::Terminator => {
                self.mode = Mode::Command;
                self.prompt();
            }
            RecordKind::Header | RecordKind::Count => {}
        }
    }
}

impl Transport for DummyProgrammer {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.host_baud != self.device_baud {
            // Framing errors on the programmer side; nothing is understood
            self.line.clear();
            return Ok(());
        }
        for &b in data {
            self.receive_byte(b);
        }
        Ok(())
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.host_baud != self.device_baud {
            self.outgoing.clear();
            return Ok(0);
        }
        let Some(mut packet) = self.outgoing.pop_front() else {
            return Ok(0);
        };
        let limit = self
            .config
            .max_read
            .map_or(buf.len(), |max| max.clamp(1, buf.len()));
        if packet.len() > limit {
            let rest = packet.split_off(limit);
            self.outgoing.push_front(rest);
        }
        buf[..packet.len()].copy_from_slice(&packet);
        Ok(packet.len())
    }

    fn set_baud(&mut self, baud: BaudRate) -> Result<()> {
        self.host_baud = baud;
        self.baud_changes.push(baud);
        Ok(())
    }

    fn baud(&self) -> BaudRate {
        self.host_baud
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(dummy: &mut DummyProgrammer) -> String {
        let mut out = Vec::new();
        let mut buf = [0u8; 255];
        loop {
            let n = dummy.read_nonblock(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cancel_gives_prompt() {
        let mut dummy = DummyProgrammer::at(BaudRate::B9600);
        dummy.write(b"\x1B\r").unwrap();
        assert_eq!(drain(&mut dummy), "\r\n*");
    }

    #[test]
    fn test_wrong_baud_is_ignored() {
        let mut dummy = DummyProgrammer::new(DummyConfig::default(), BaudRate::B300);
        dummy.write(b"\x1B\r").unwrap();
        assert_eq!(drain(&mut dummy), "");
        assert!(dummy.commands().is_empty());
    }

    #[test]
    fn test_baud_switch() {
        let mut dummy = DummyProgrammer::at(BaudRate::B300);
        dummy.write(b"1X\r").unwrap();
        assert_eq!(dummy.device_baud(), BaudRate::B9600);
        // host still at 300, so the programmer hears nothing now
        dummy.write(b"\r").unwrap();
        assert_eq!(dummy.commands(), &["1X".to_string()]);
    }

    #[test]
    fn test_setup_commands() {
        let mut dummy = DummyProgrammer::at(BaudRate::B9600);
        dummy.write(b"01A2B3S\r0100P\r0100O\r01FFL\r").unwrap();
        assert_eq!(dummy.device_code(), 0x1A2B3);
        assert_eq!(dummy.addresses(), (0x100, 0x1FF, 0x100));
        drain(&mut dummy);

        dummy.write(b"SPLO\r").unwrap();
        assert_eq!(drain(&mut dummy), "SPLO\r\n01A2B3 0100 01FF 0100\n*");
    }

    #[test]
    fn test_unknown_command_is_error() {
        let mut dummy = DummyProgrammer::at(BaudRate::B9600);
        dummy.write(b"Q\r").unwrap();
        let mut buf = [0u8; 255];
        let n = dummy.read_nonblock(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"Error\n");
    }

    #[test]
    fn test_write_then_verify_records() {
        let mut dummy = DummyProgrammer::at(BaudRate::B9600);
        let record = srec::data_record(0x10, &[1, 2, 3]).unwrap();

        dummy.write(b"W\r").unwrap();
        dummy.write(format!("{}\r", record).as_bytes()).unwrap();
        dummy.write(format!("{}\r", srec::terminator_record(0x12)).as_bytes()).unwrap();
        assert_eq!(&dummy.memory()[0x10..0x13], &[1, 2, 3]);
        drain(&mut dummy);

        dummy.load_memory(0x11, &[0xEE]);
        dummy.write(b"V\r").unwrap();
        drain(&mut dummy);
        dummy.write(format!("{}\r", record).as_bytes()).unwrap();
        assert_eq!(drain(&mut dummy), "VERIFY ERROR 0011\n");
        assert_eq!(dummy.status(), "VERIFY ERROR AT 0011");
    }

    #[test]
    fn test_empty_check() {
        let mut dummy = DummyProgrammer::at(BaudRate::B9600);
        dummy.write(b"0000P\r000FL\rT\r").unwrap();
        assert_eq!(dummy.status(), "EMPTY");

        dummy.load_memory(0x8, &[0x00]);
        dummy.write(b"T\r").unwrap();
        assert_eq!(dummy.status(), "NOT EMPTY AT 0008");
    }

    #[test]
    fn test_unanswered_command_skips_next_prompt() {
        let mut dummy = DummyProgrammer::new(
            DummyConfig {
                unanswered: "T".to_string(),
                ..Default::default()
            },
            BaudRate::B9600,
        );
        dummy.write(b"0000P\r000FL\r").unwrap();
        drain(&mut dummy);

        dummy.write(b"T\r\r").unwrap();
        assert_eq!(drain(&mut dummy), "");
        assert_eq!(dummy.status(), "EMPTY");

        dummy.write(b"G\r").unwrap();
        assert_eq!(drain(&mut dummy), "G\r\nEMPTY\n*");
    }

    #[test]
    fn test_max_read_caps_each_read() {
        let mut dummy = DummyProgrammer::new(
            DummyConfig {
                max_read: Some(4),
                ..Default::default()
            },
            BaudRate::B9600,
        );
        dummy.write(b"G\r").unwrap();

        let mut buf = [0u8; 255];
        let mut reads = Vec::new();
        loop {
            let n = dummy.read_nonblock(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            reads.push(String::from_utf8(buf[..n].to_vec()).unwrap());
        }
        assert_eq!(reads, ["G\r\nR", "EADY", "\n", "*"]);
    }

    #[test]
    fn test_long_packets_are_split() {
        let mut dummy = DummyProgrammer::at(BaudRate::B9600);
        dummy.write(b"0000P\r00FFL\r").unwrap();
        drain(&mut dummy);
        dummy.write(b"R\r").unwrap();

        let mut buf = [0u8; 16];
        let n = dummy.read_nonblock(&mut buf).unwrap();
        assert!(n <= 16);
        let text = drain(&mut dummy);
        assert!(text.ends_with('*'));
        assert_eq!(text.matches("S3").count(), 8);
    }
}
