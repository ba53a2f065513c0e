//! Error types for EPP-2 sessions

use thiserror::Error;

/// Hard failures that end a session
///
/// Soft failures (a missing prompt, a rejected record line, an unreadable
/// record file) are not errors; they are reported in
/// [`SessionReport`](crate::SessionReport).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Serial device node could not be opened
    #[error("failed to open serial port {path}: {source}")]
    OpenFailure {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// Line discipline or baud rate could not be applied
    #[error("failed to set communication parameters on {path}: {reason}")]
    ConfigFailure { path: String, reason: String },

    /// The programmer answered a setup command with `Error`
    #[error("programmer rejected command {command:?}")]
    Protocol { command: String },

    /// No prompt at the configured baud rate after repeated negotiation
    #[error("no command prompt after {attempts} baud negotiation attempts")]
    SyncFailed { attempts: u32 },

    /// Core error (bad arguments, transport failures)
    #[error(transparent)]
    Core(#[from] epp2_core::Error),

    /// I/O error on an output or diagnostic stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for session operations
pub type Result<T> = core::result::Result<T, SessionError>;
