//! Reporting of device write failures.
//!
//! The writer never returns these errors. It hands them to a
//! [`DiagnosticSink`] and carries on posting.

use hal::HalError;

/// A raw write the driver rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFailure {
    /// Value as tracked by the session (after toggling, before shifting).
    pub logical: u32,
    /// Value handed to the driver.
    pub raw: u32,
    pub error: HalError,
}

/// Receives write failures from a [`PortSession`](crate::PortSession).
pub trait DiagnosticSink: Send {
    fn write_failed(&mut self, failure: &WriteFailure);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(&WriteFailure) + Send,
{
    fn write_failed(&mut self, failure: &WriteFailure) {
        self(failure)
    }
}

/// Default sink: logs through the `log` facade.
///
/// Only the first failure is logged at `warn`; the rest go out at `debug`.
#[derive(Debug, Default)]
pub struct LogSink {
    reported: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for LogSink {
    fn write_failed(&mut self, failure: &WriteFailure) {
        if self.reported == 0 {
            log::warn!(
                "error writing to port ({}), raw value {:#010x}; further failures logged at debug",
                failure.error,
                failure.raw
            );
        } else {
            log::debug!(
                "error writing to port ({}), raw value {:#010x}",
                failure.error,
                failure.raw
            );
        }
        self.reported += 1;
    }
}
