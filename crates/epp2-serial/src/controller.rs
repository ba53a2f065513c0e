//! Programmer session: negotiation, device setup, operation, status
//!
//! A [`Session`] owns the serial line for its whole lifetime. [`Session::run`]
//! performs one operation end to end:
//!
//! 1. Negotiate the configured baud rate
//! 2. Set device code, start/offset address and (for reads and checks) the
//!    end address, then query the effective range
//! 3. Run the operation
//! 4. Query and report the programmer status
//!
//! An `Error` reply during setup aborts the session before the operation
//! and the status query. Problems inside the operation (a rejected record
//! line, a missing record file) only end the operation; the status query
//! still runs.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use epp2_core::{AddressRange, BaudRate, DeviceCode, OperationKind, Transport};

use crate::channel::{printable, CommandChannel, Response, Sink};
use crate::error::{Result, SessionError};
use crate::negotiate::BaudNegotiator;
use crate::progress::Progress;
use crate::protocol::*;

/// The programmer-side part of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Check that the range is erased
    EmptyCheck { start: Option<u16>, end: Option<u16> },
    /// Stream the range to the primary output
    Read { start: Option<u16>, end: Option<u16> },
    /// Program the records in a file starting at `start`
    Write { start: u16, records: PathBuf },
    /// Compare the records in a file starting at `start`
    Verify { start: u16, records: PathBuf },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::EmptyCheck { .. } => OperationKind::EmptyCheck,
            Self::Read { .. } => OperationKind::Read,
            Self::Write { .. } => OperationKind::Write,
            Self::Verify { .. } => OperationKind::Verify,
        }
    }

    /// Start address, if one was given
    pub fn start(&self) -> Option<u16> {
        match self {
            Self::EmptyCheck { start, .. } | Self::Read { start, .. } => *start,
            Self::Write { start, .. } | Self::Verify { start, .. } => Some(*start),
        }
    }

    /// End address, if one was given
    ///
    /// Write and verify never set an end address; the records decide.
    pub fn end(&self) -> Option<u16> {
        match self {
            Self::EmptyCheck { end, .. } | Self::Read { end, .. } => *end,
            Self::Write { .. } | Self::Verify { .. } => None,
        }
    }

    /// Check the address arguments before touching the line
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start(), self.end()) {
            AddressRange::new(start, end)?;
        }
        Ok(())
    }
}

/// Everything needed to run one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub device: DeviceCode,
    pub operation: Operation,
}

/// How the operation itself ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Empty check ran to its prompt
    Completed,
    /// Read finished streaming
    ReadComplete { bytes: usize },
    /// Every record line was accepted
    RecordsComplete { sent: usize },
    /// The programmer answered a record line with a complaint
    LineMismatch {
        /// 1-based line number in the record file
        line: usize,
        /// The record as sent
        record: String,
        /// What the programmer said about it
        response: String,
        /// Record lines sent, including the rejected one
        sent: usize,
    },
    /// The record file could not be used
    FileFailure { path: PathBuf, reason: String },
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::ReadComplete { .. } | Self::RecordsComplete { .. }
        )
    }
}

/// What a finished session reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub operation: OperationKind,
    pub baud: BaudRate,
    /// The `SPLO` reply: device code, start, end and offset as seen by the
    /// programmer
    pub range: String,
    pub outcome: OperationOutcome,
    /// Final status text from the programmer
    pub status: String,
    /// Prompt waits that gave up, negotiation included
    pub prompt_timeouts: u32,
}

/// One session with the programmer
pub struct Session<T: Transport, D: Write = io::Stderr> {
    channel: CommandChannel<T, D>,
    negotiator: BaudNegotiator,
}

impl<T: Transport, D: Write> Session<T, D> {
    /// Wrap a channel; `baud` is the rate the session should run at
    pub fn new(channel: CommandChannel<T, D>, baud: BaudRate, sync_attempts: u32) -> Self {
        Self {
            channel,
            negotiator: BaudNegotiator::new(baud, sync_attempts),
        }
    }

    pub fn channel(&self) -> &CommandChannel<T, D> {
        &self.channel
    }

    /// Run one operation end to end
    ///
    /// Read data goes to `out`. Hard failures (serial I/O errors, failed
    /// negotiation, an `Error` reply during setup) are returned as
    /// [`SessionError`]; everything else ends up in the report.
    pub fn run(
        &mut self,
        request: &Request,
        out: &mut dyn Write,
        progress: &mut dyn Progress,
    ) -> Result<SessionReport> {
        let operation = &request.operation;
        operation.validate()?;

        let negotiation = self.negotiator.run(&mut self.channel)?;
        let mut prompt_timeouts = negotiation.prompt_timeouts;

        let range = self.setup(request)?;
        log::debug!("Programmer range: {}", range);

        let outcome = match operation {
            Operation::EmptyCheck { .. } => {
                self.channel.banner("EMPTY CHECK")?;
                self.channel.send(EMPTY_CHECK, false)?;
                if !self.channel.wait_for_prompt()? {
                    prompt_timeouts += 1;
                }
                OperationOutcome::Completed
            }
            Operation::Read { .. } => {
                self.channel.banner("READ DATA")?;
                self.channel.send(READ, false)?;
                progress.reading();
                let sink = Sink::Primary {
                    out: &mut *out,
                    progress: &mut *progress,
                };
                let response = self.channel.receive(READ_TICKS, sink)?;
                progress.finish();
                out.flush()?;
                OperationOutcome::ReadComplete {
                    bytes: response.bytes,
                }
            }
            Operation::Write { records, .. } | Operation::Verify { records, .. } => {
                let kind = operation.kind();
                let (title, command) = if kind == OperationKind::Write {
                    ("WRITE DATA", WRITE)
                } else {
                    ("VERIFY DATA", VERIFY)
                };
                self.channel.banner(title)?;
                self.channel.send(command, false)?;
                self.channel.receive(REPLY_TICKS, Sink::Diagnostic)?;

                match File::open(records) {
                    Ok(file) => {
                        progress.sending_records(kind);
                        let outcome =
                            self.stream_records(records, BufReader::new(file), progress)?;
                        progress.finish();
                        if !self.channel.wait_for_prompt()? {
                            prompt_timeouts += 1;
                        }
                        outcome
                    }
                    Err(e) => {
                        log::error!(
                            "Failed to open Motorola S-Record file {}: {}",
                            records.display(),
                            e
                        );
                        OperationOutcome::FileFailure {
                            path: records.clone(),
                            reason: e.to_string(),
                        }
                    }
                }
            }
        };

        let status = self.status()?;

        Ok(SessionReport {
            operation: operation.kind(),
            baud: negotiation.baud,
            range,
            outcome,
            status,
            prompt_timeouts,
        })
    }

    /// Send a setup command; an `Error` reply aborts the session
    fn command(&mut self, command: &str) -> Result<Response> {
        self.channel.send(command, false)?;
        let response = self.channel.receive(REPLY_TICKS, Sink::Diagnostic)?;
        if response.is_error() {
            return Err(SessionError::Protocol {
                command: command.to_string(),
            });
        }
        if !response.is_prompt() {
            log::warn!("No prompt after {:?}", printable(command));
        }
        Ok(response)
    }

    /// Device code, addresses and range query; returns the range reply
    fn setup(&mut self, request: &Request) -> Result<String> {
        let operation = &request.operation;

        self.channel.banner(&format!("SET DEVICE CODE: {}", request.device))?;
        self.command(&set_device(request.device))?;

        match operation.start() {
            Some(start) => {
                self.channel.banner("SET START ADDRESS")?;
                self.command(&set_start(start))?;
                self.channel.banner("SET OFFSET ADDRESS")?;
                self.command(&set_offset(start))?;
            }
            None => {
                self.command(DEFAULT_OFFSET)?;
            }
        }

        if !operation.kind().sends_records() {
            if let Some(end) = operation.end() {
                self.channel.banner("SET END ADDRESS")?;
                self.command(&set_end(end))?;
            }
        }

        self.channel.banner("GET ADDRESS RANGE")?;
        let response = self.command(QUERY_RANGE)?;
        Ok(response.text.trim().to_string())
    }

    /// Send every `S` line of a record file, one exchange per line
    ///
    /// Stops at the first line the programmer answers with text.
    fn stream_records<R: BufRead>(
        &mut self,
        path: &Path,
        reader: R,
        progress: &mut dyn Progress,
    ) -> Result<OperationOutcome> {
        let mut sent = 0;

        for (index, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Ok(OperationOutcome::FileFailure {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })
                }
            };
            let record = line.trim_end_matches(['\r', '\n']);
            if !record.starts_with('S') {
                continue;
            }

            let mut buffer: heapless::String<CHUNK_LEN> = heapless::String::new();
            if buffer.push_str(record).is_err() {
                return Ok(OperationOutcome::FileFailure {
                    path: path.to_path_buf(),
                    reason: format!(
                        "line {} is longer than {} bytes",
                        index + 1,
                        CHUNK_LEN
                    ),
                });
            }

            self.channel.send(&buffer, false)?;
            sent += 1;
            progress.record_sent(sent);

            let response = self.channel.receive(LINE_TICKS, Sink::Diagnostic)?;
            if response.has_data() || response.is_error() {
                let complaint = if response.is_error() {
                    "Error".to_string()
                } else {
                    response.text.trim().to_string()
                };
                log::warn!("Line {} rejected: {}", index + 1, complaint);
                return Ok(OperationOutcome::LineMismatch {
                    line: index + 1,
                    record: buffer.as_str().to_string(),
                    response: complaint,
                    sent,
                });
            }
        }

        log::info!("Sent {} records", sent);
        Ok(OperationOutcome::RecordsComplete { sent })
    }

    /// Ask the programmer how the operation went
    fn status(&mut self) -> Result<String> {
        self.channel.banner("EPP-2 STATUS")?;
        self.channel.send(STATUS, false)?;
        let response = self.channel.receive(REPLY_TICKS, Sink::Diagnostic)?;
        Ok(response.text.trim().to_string())
    }
}

impl<T: Transport, D: Write> Drop for Session<T, D> {
    fn drop(&mut self) {
        log::debug!("Session closed at {} baud", self.channel.transport().baud());
    }
}
