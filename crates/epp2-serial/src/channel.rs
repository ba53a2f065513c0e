//! Command/response exchange with the programmer
//!
//! The line is half duplex: a command goes out, then the reply is polled
//! until it ends in a prompt, matches the error reply, or the line stays
//! idle for the whole tick budget. Only then may the next command be sent.

use std::io::{self, Write};

use epp2_core::Transport;

use crate::error::Result;
use crate::progress::Progress;
use crate::protocol::*;

/// How a reply ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Last byte received was `*`; the programmer is ready
    Prompt,
    /// The reply was exactly `Error\n`
    Error,
    /// Bytes arrived but the line went idle without a terminator
    Data,
    /// Nothing arrived within the tick budget
    Timeout,
}

/// A classified reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub classification: Classification,
    /// Text of the last data chunk, minus the command echo
    pub payload: String,
    /// Whole reply minus the command echo and the prompt, cut off at
    /// [`CHUNK_LEN`] bytes
    pub text: heapless::String<CHUNK_LEN>,
    /// Total bytes received
    pub bytes: usize,
}

impl Response {
    pub fn is_prompt(&self) -> bool {
        self.classification == Classification::Prompt
    }

    pub fn is_error(&self) -> bool {
        self.classification == Classification::Error
    }

    /// An unterminated reply that still carried text
    ///
    /// This is how the programmer reports a rejected record line. Any text
    /// counts, a lone line feed included.
    pub fn has_data(&self) -> bool {
        self.classification == Classification::Data && !self.payload.is_empty()
    }
}

/// Where received text goes as it arrives
pub enum Sink<'a> {
    /// Nowhere
    Silent,
    /// The diagnostic stream, with ESC shown as `~`
    Diagnostic,
    /// The operation's primary output, byte for byte
    Primary {
        out: &'a mut dyn Write,
        progress: &'a mut dyn Progress,
    },
}

/// Replace the escape byte with `~` for display
pub fn printable(text: &str) -> String {
    text.replace(ESC as char, "~")
}

/// Append as much of `fragment` as fits; returns `true` once `text` is full
fn append_bounded(text: &mut heapless::String<CHUNK_LEN>, fragment: &str) -> bool {
    for c in fragment.chars() {
        if text.push(c).is_err() {
            return true;
        }
    }
    false
}

/// Command channel over a [`Transport`]
///
/// Owns the transport and a diagnostic stream where sent commands and
/// received replies are mirrored for the user.
pub struct CommandChannel<T: Transport, D: Write = io::Stderr> {
    transport: T,
    diag: D,
    timing: Timing,
}

impl<T: Transport, D: Write> CommandChannel<T, D> {
    pub fn new(transport: T, diag: D, timing: Timing) -> Self {
        Self {
            transport,
            diag,
            timing,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The diagnostic stream
    pub fn diagnostics(&self) -> &D {
        &self.diag
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Tear the channel apart, returning the transport and diagnostic stream
    pub fn into_parts(self) -> (T, D) {
        (self.transport, self.diag)
    }

    /// Give the programmer time to act on the last command
    pub fn settle(&self) {
        if !self.timing.settle.is_zero() {
            std::thread::sleep(self.timing.settle);
        }
    }

    /// Write an underlined section heading to the diagnostic stream
    pub fn banner(&mut self, title: &str) -> Result<()> {
        writeln!(self.diag)?;
        writeln!(self.diag, "{}", title)?;
        writeln!(self.diag, "{}", "=".repeat(title.len()))?;
        Ok(())
    }

    /// Send one command line
    ///
    /// A CR is appended. Unless `silent`, the command is echoed to the
    /// diagnostic stream prefixed with `>`.
    pub fn send(&mut self, text: &str, silent: bool) -> Result<()> {
        let mut line = Vec::with_capacity(text.len() + 1);
        line.extend_from_slice(text.as_bytes());
        line.push(CR);

        log::trace!("tx {:?}", String::from_utf8_lossy(&line));
        self.transport.write(&line)?;

        if !silent {
            writeln!(self.diag, ">{}", printable(text))?;
        }
        Ok(())
    }

    /// Poll for a reply
    ///
    /// Up to `ticks` consecutive empty polls are allowed; any received
    /// bytes restart the count. A chunk ending in `*` classifies the reply
    /// as [`Classification::Prompt`] and a reply of exactly `Error\n` as
    /// [`Classification::Error`]; either ends the poll. Text before the
    /// prompt is still delivered to the sink.
    ///
    /// When the budget runs out, the reply is [`Classification::Data`] if
    /// anything arrived and [`Classification::Timeout`] otherwise; neither
    /// counts as a terminated reply.
    pub fn receive(&mut self, ticks: u32, mut sink: Sink<'_>) -> Result<Response> {
        let mut buf = [0u8; CHUNK_LEN];
        let mut accumulated: heapless::Vec<u8, CHUNK_LEN> = heapless::Vec::new();
        let mut overflowed = false;
        let mut truncated = false;
        let mut echo_pending = true;

        let mut response = Response {
            classification: Classification::Timeout,
            payload: String::new(),
            text: heapless::String::new(),
            bytes: 0,
        };

        let mut idle = 0;
        while idle < ticks {
            let n = self.transport.read_nonblock(&mut buf)?;
            if n == 0 {
                idle += 1;
                if !self.timing.tick.is_zero() {
                    std::thread::sleep(self.timing.tick);
                }
                continue;
            }

            idle = 0;
            response.bytes += n;
            let chunk = &buf[..n];
            log::trace!("rx {:?}", String::from_utf8_lossy(chunk));

            if !overflowed && accumulated.extend_from_slice(chunk).is_err() {
                overflowed = true;
            }
            if !overflowed && accumulated.as_slice() == ERROR_REPLY {
                response.classification = Classification::Error;
                break;
            }

            let prompt = chunk[n - 1] == PROMPT;
            let body = if prompt { &chunk[..n - 1] } else { chunk };
            let text = match body.iter().position(|&b| b == CR) {
                Some(pos) if echo_pending => {
                    echo_pending = false;
                    &body[pos + 1..]
                }
                _ => body,
            };

            if !text.is_empty() {
                response.payload = String::from_utf8_lossy(text).into_owned();
                if !truncated {
                    truncated = append_bounded(&mut response.text, &response.payload);
                    if truncated {
                        log::debug!("Reply text cut off at {} bytes", CHUNK_LEN);
                    }
                }
                match &mut sink {
                    Sink::Silent => {}
                    Sink::Diagnostic => write!(self.diag, "{}", printable(&response.payload))?,
                    Sink::Primary { out, progress } => {
                        out.write_all(text)?;
                        progress.bytes_received(response.bytes);
                    }
                }
            }

            if prompt {
                response.classification = Classification::Prompt;
                break;
            }
            response.classification = Classification::Data;
        }

        if response.bytes > 0 && matches!(sink, Sink::Diagnostic) {
            writeln!(self.diag)?;
        }

        Ok(response)
    }

    /// Nudge the programmer with a bare CR and wait for its prompt
    ///
    /// Returns `false` if no prompt was seen. That is not fatal: a warning
    /// is logged and the caller carries on.
    pub fn wait_for_prompt(&mut self) -> Result<bool> {
        self.send("", true)?;
        self.settle();

        let mut found = false;
        for _ in 0..PROMPT_POLLS {
            if self.receive(REPLY_TICKS, Sink::Silent)?.is_prompt() {
                found = true;
                break;
            }
        }

        // Drain anything trailing the prompt
        self.settle();
        self.receive(REPLY_TICKS, Sink::Silent)?;

        if !found {
            log::warn!("Didn't find command prompt");
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use epp2_core::BaudRate;
    use std::collections::VecDeque;

    /// Transport that plays back scripted chunks and records writes
    struct Script {
        chunks: VecDeque<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Script {
        fn new(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                written: Vec::new(),
            }
        }
    }

    impl Transport for Script {
        fn write(&mut self, data: &[u8]) -> epp2_core::Result<()> {
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn read_nonblock(&mut self, buf: &mut [u8]) -> epp2_core::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }

        fn set_baud(&mut self, _baud: BaudRate) -> epp2_core::Result<()> {
            Ok(())
        }

        fn baud(&self) -> BaudRate {
            BaudRate::B9600
        }
    }

    fn channel(chunks: &[&[u8]]) -> CommandChannel<Script, Vec<u8>> {
        CommandChannel::new(Script::new(chunks), Vec::new(), Timing::instant())
    }

    fn diag_text(ch: &CommandChannel<Script, Vec<u8>>) -> String {
        String::from_utf8(ch.diagnostics().clone()).unwrap()
    }

    #[test]
    fn test_send_appends_cr_and_mirrors() {
        let mut ch = channel(&[]);
        ch.send("\x1B", false).unwrap();
        assert_eq!(ch.transport().written, b"\x1B\r");
        assert_eq!(diag_text(&ch), ">~\n");
    }

    #[test]
    fn test_banner() {
        let mut ch = channel(&[]);
        ch.banner("READ DATA").unwrap();
        assert_eq!(diag_text(&ch), "\nREAD DATA\n=========\n");
    }

    #[test]
    fn test_silent_send_emits_no_diagnostics() {
        let mut ch = channel(&[]);
        ch.send("\x1B", true).unwrap();
        ch.send("1X", true).unwrap();
        assert_eq!(ch.transport().written, b"\x1B\r1X\r");
        assert!(ch.diagnostics().is_empty());
    }

    #[test]
    fn test_prompt_is_last_byte_star() {
        for chunk in [&b"*"[..], b"anything at all*", b"Error\n*", b"\r\n*"] {
            let mut ch = channel(&[chunk]);
            let r = ch.receive(16, Sink::Silent).unwrap();
            assert_eq!(r.classification, Classification::Prompt, "{:?}", chunk);
        }
    }

    #[test]
    fn test_star_not_last_is_data() {
        let mut ch = channel(&[b"*\n"]);
        let r = ch.receive(16, Sink::Silent).unwrap();
        assert_eq!(r.classification, Classification::Data);
    }

    #[test]
    fn test_error_reply() {
        let mut ch = channel(&[b"Error\n", b"*"]);
        let r = ch.receive(16, Sink::Silent).unwrap();
        assert!(r.is_error());
        // the prompt is left for the next receive
        assert!(ch.receive(16, Sink::Silent).unwrap().is_prompt());
    }

    #[test]
    fn test_error_reply_across_chunks() {
        let mut ch = channel(&[b"Err", b"or\n"]);
        assert!(ch.receive(16, Sink::Silent).unwrap().is_error());
    }

    #[test]
    fn test_near_error_is_data() {
        for chunk in [&b"Error"[..], b"Error\r\n", b"error\n", b" Error\n"] {
            let mut ch = channel(&[chunk]);
            let r = ch.receive(16, Sink::Silent).unwrap();
            assert_eq!(r.classification, Classification::Data, "{:?}", chunk);
        }
    }

    #[test]
    fn test_timeout_when_nothing_arrives() {
        let mut ch = channel(&[]);
        let r = ch.receive(32, Sink::Diagnostic).unwrap();
        assert_eq!(r.classification, Classification::Timeout);
        assert_eq!(r.bytes, 0);
        assert!(ch.diagnostics().is_empty());
    }

    #[test]
    fn test_echo_is_stripped_from_first_chunk_only() {
        let mut ch = channel(&[b"G\rSTATUS\n", b"MORE\rTEXT\n"]);
        let mut out = Vec::new();
        let mut progress = NoProgress;
        let r = ch
            .receive(
                16,
                Sink::Primary {
                    out: &mut out,
                    progress: &mut progress,
                },
            )
            .unwrap();
        assert_eq!(r.classification, Classification::Data);
        assert_eq!(r.payload, "MORE\rTEXT\n");
        assert_eq!(out, b"STATUS\nMORE\rTEXT\n");
    }

    #[test]
    fn test_text_before_prompt_is_kept() {
        let mut ch = channel(&[b"G\r\nWRITE OK\n*"]);
        let r = ch.receive(16, Sink::Diagnostic).unwrap();
        assert!(r.is_prompt());
        assert_eq!(r.payload, "\nWRITE OK\n");
        assert_eq!(r.text.as_str(), "\nWRITE OK\n");
        assert_eq!(diag_text(&ch), "\nWRITE OK\n\n");
    }

    #[test]
    fn test_reply_split_across_reads_is_collected() {
        let mut ch = channel(&[b"G\r\nWRI", b"TE OK\n", b"*"]);
        let r = ch.receive(16, Sink::Diagnostic).unwrap();
        assert!(r.is_prompt());
        assert_eq!(r.payload, "TE OK\n");
        assert_eq!(r.text.trim(), "WRITE OK");
        assert_eq!(diag_text(&ch), "\nWRITE OK\n\n");
    }

    #[test]
    fn test_long_reply_text_is_cut_off() {
        let first = [b'A'; 200];
        let second = [b'B'; 200];
        let mut ch = channel(&[&first, &second]);
        let r = ch.receive(16, Sink::Silent).unwrap();
        assert_eq!(r.bytes, 400);
        assert_eq!(r.text.len(), CHUNK_LEN);
        assert!(r.text.starts_with(&"A".repeat(200)));
        assert!(r.text.ends_with('B'));
    }

    #[test]
    fn test_lone_line_feed_counts_as_data() {
        let mut ch = channel(&[b"\n"]);
        let r = ch.receive(16, Sink::Silent).unwrap();
        assert_eq!(r.classification, Classification::Data);
        assert!(r.has_data());

        let mut ch = channel(&[]);
        assert!(!ch.receive(16, Sink::Silent).unwrap().has_data());
    }

    #[test]
    fn test_idle_count_restarts_on_data() {
        // Two chunks separated by fewer idle polls than the budget
        let mut chunks: Vec<&[u8]> = vec![b"A\r"];
        chunks.extend(std::iter::repeat(&b""[..]).take(3));
        chunks.push(b"B*");
        let mut ch = CommandChannel::new(
            Script {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                written: Vec::new(),
            },
            Vec::new(),
            Timing::instant(),
        );
        let r = ch.receive(4, Sink::Silent).unwrap();
        assert!(r.is_prompt());
        assert_eq!(r.payload, "B");
    }

    #[test]
    fn test_wait_for_prompt() {
        let mut ch = channel(&[b"\r\n*"]);
        assert!(ch.wait_for_prompt().unwrap());
        assert_eq!(ch.transport().written, b"\r");
        assert!(ch.diagnostics().is_empty());

        let mut ch = channel(&[]);
        assert!(!ch.wait_for_prompt().unwrap());
    }
}
