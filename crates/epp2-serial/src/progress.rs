//! Progress reporting hooks
//!
//! The session calls these while data streams in (read) or record lines go
//! out (write, verify). The CLI renders them; library users can pass
//! [`NoProgress`].

use epp2_core::OperationKind;

/// Progress callbacks for long-running operations
pub trait Progress {
    /// A read has started streaming data
    fn reading(&mut self);

    /// Total bytes received so far during a read
    fn bytes_received(&mut self, total: usize);

    /// Record lines are about to be sent for a write or verify
    fn sending_records(&mut self, operation: OperationKind);

    /// Number of record lines sent so far
    fn record_sent(&mut self, count: usize);

    /// The streaming phase is over
    fn finish(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn reading(&mut self) {}
    fn bytes_received(&mut self, _total: usize) {}
    fn sending_records(&mut self, _operation: OperationKind) {}
    fn record_sent(&mut self, _count: usize) {}
    fn finish(&mut self) {}
}
