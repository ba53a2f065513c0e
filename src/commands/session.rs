//! Programmer session command (empty check, read, write, verify)

use crate::config::Config;
use epp2_core::{DeviceCode, OperationKind, Transport};
use epp2_serial::{
    open_session, CommandChannel, Operation, OperationOutcome, Progress, Request, Session,
    SessionReport, Timing,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Port name that selects the built-in programmer emulator
#[cfg(feature = "dummy")]
pub const DUMMY_PORT: &str = "dummy";

/// Spinner-based progress display
#[derive(Default)]
pub struct CliProgress {
    bar: Option<ProgressBar>,
}

impl CliProgress {
    fn start(&mut self, template: &str, message: &'static str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template(template)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message);
        self.bar = Some(bar);
    }
}

impl Progress for CliProgress {
    fn reading(&mut self) {
        self.start("{spinner:.green} [{elapsed_precise}] {bytes} {msg}", "received");
    }

    fn bytes_received(&mut self, total: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(total as u64);
        }
    }

    fn sending_records(&mut self, operation: OperationKind) {
        let message = if operation == OperationKind::Write {
            "records written"
        } else {
            "records verified"
        };
        self.start("{spinner:.green} [{elapsed_precise}] {pos} {msg}", message);
    }

    fn record_sent(&mut self, count: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(count as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

/// Run one programmer operation
pub fn run(
    config: &Config,
    sync_attempts: u32,
    device: DeviceCode,
    operation: Operation,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let baud = config.baud()?;
    let request = Request { device, operation };
    request.operation.validate()?;

    log::info!("Serial port: {}", config.serial_port);
    log::info!("Baud rate: {}", baud);

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            format!("Failed to create output file {}: {}", path.display(), e)
        })?)),
        None => Box::new(io::stdout().lock()),
    };

    #[cfg(feature = "dummy")]
    if config.serial_port == DUMMY_PORT {
        log::info!("Using the in-memory programmer emulator");
        let dummy = epp2_dummy::DummyProgrammer::at(baud);
        let channel = CommandChannel::new(dummy, io::stderr(), Timing::instant());
        let session = Session::new(channel, baud, sync_attempts);
        return execute(session, &request, &mut out);
    }

    let session = open_session(&config.serial_port, baud, Timing::default(), sync_attempts)?;
    execute(session, &request, &mut out)
}

fn execute<T: Transport>(
    mut session: Session<T>,
    request: &Request,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = CliProgress::default();
    let report = session.run(request, out, &mut progress)?;
    summarize(&report)
}

/// Log the report and turn a failed operation into an error
fn summarize(report: &SessionReport) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Programmer range: {}", report.range);
    if report.prompt_timeouts > 0 {
        log::warn!(
            "{} prompt waits timed out; the programmer may be out of step",
            report.prompt_timeouts
        );
    }

    match &report.outcome {
        OperationOutcome::Completed => {
            log::info!("{} complete: {}", operation_name(report.operation), report.status);
            Ok(())
        }
        OperationOutcome::ReadComplete { bytes } => {
            log::info!("Read {} bytes", bytes);
            Ok(())
        }
        OperationOutcome::RecordsComplete { sent } => {
            log::info!(
                "{} complete: {} records, status {}",
                operation_name(report.operation),
                sent,
                report.status
            );
            Ok(())
        }
        OperationOutcome::LineMismatch {
            line,
            record,
            response,
            ..
        } => Err(format!(
            "{} failed at line {} ({}): {}",
            operation_name(report.operation),
            line,
            record,
            response
        )
        .into()),
        OperationOutcome::FileFailure { path, reason } => Err(format!(
            "Failed to open Motorola S-Record file {}: {}",
            path.display(),
            reason
        )
        .into()),
    }
}

fn operation_name(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Search => "Search",
        OperationKind::Spec => "Spec",
        OperationKind::EmptyCheck => "Empty check",
        OperationKind::Read => "Read",
        OperationKind::Write => "Write",
        OperationKind::Verify => "Verify",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epp2_core::BaudRate;

    fn report(outcome: OperationOutcome) -> SessionReport {
        SessionReport {
            operation: OperationKind::Write,
            baud: BaudRate::B19200,
            range: "01A2B3 0000 FFFF 0000".to_string(),
            outcome,
            status: "WRITE OK".to_string(),
            prompt_timeouts: 0,
        }
    }

    #[test]
    fn test_soft_failures_become_errors() {
        assert!(summarize(&report(OperationOutcome::RecordsComplete { sent: 3 })).is_ok());

        let err = summarize(&report(OperationOutcome::LineMismatch {
            line: 4,
            record: "S3...".to_string(),
            response: "LINE ERROR 4".to_string(),
            sent: 4,
        }))
        .unwrap_err();
        assert!(err.to_string().contains("line 4"));

        assert!(summarize(&report(OperationOutcome::FileFailure {
            path: "missing.hex".into(),
            reason: "not found".to_string(),
        }))
        .is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_empty_check_against_emulator() {
        let config = Config {
            serial_port: DUMMY_PORT.to_string(),
            baud_rate: "9600".to_string(),
        };
        let device = DeviceCode::new(0x1A2B3).unwrap();
        let operation = Operation::EmptyCheck {
            start: Some(0),
            end: Some(0xFF),
        };
        run(&config, 2, device, operation, None).unwrap();
    }

    #[test]
    fn test_bad_baud_fails_before_opening() {
        let config = Config {
            serial_port: "/nonexistent/tty".to_string(),
            baud_rate: "115200".to_string(),
        };
        let device = DeviceCode::new(0x1A2B3).unwrap();
        let operation = Operation::Read {
            start: None,
            end: None,
        };
        let err = run(&config, 1, device, operation, None).unwrap_err();
        assert!(err.to_string().contains("115200"));
    }
}
