//! Simulated digital output ports
//!
//! [`RecordingPort`] latches every write into a shared capture buffer so the
//! sequence of values appearing on the lines can be inspected afterwards.
//! [`AbsentPort`] behaves like a host with no board installed.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dout::{line_mask, DigitalOutPort};
use crate::error::{HalError, HalResult};

#[derive(Debug, Default)]
struct Capture {
    values: Vec<u32>,
    attempts: usize,
    failures: Vec<(usize, HalError)>,
}

/// Port that records every successful write.
///
/// Clones share the same capture buffer. Values are truncated to the
/// configured resolution, as the physical lines would truncate them.
#[derive(Debug, Clone)]
pub struct RecordingPort {
    capture: Arc<Mutex<Capture>>,
    resolution: u8,
}

impl Default for RecordingPort {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPort {
    /// Creates a 32-line port.
    pub fn new() -> Self {
        Self::with_resolution(32)
    }

    pub fn with_resolution(resolution: u8) -> Self {
        Self {
            capture: Arc::new(Mutex::new(Capture::default())),
            resolution,
        }
    }

    /// Values latched and not yet taken, oldest first.
    pub fn values(&self) -> Vec<u32> {
        self.capture.lock().values.clone()
    }

    /// Removes and returns the values latched so far. Attempt numbering
    /// keeps counting.
    pub fn take_values(&self) -> Vec<u32> {
        std::mem::take(&mut self.capture.lock().values)
    }

    /// Most recent value not yet taken.
    pub fn current(&self) -> Option<u32> {
        self.capture.lock().values.last().copied()
    }

    /// Number of `put_single_value` calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.capture.lock().attempts
    }

    /// Makes the write attempt with index `attempt` (0-based, counted across
    /// the port's lifetime) fail with `error`.
    pub fn fail_attempt(&self, attempt: usize, error: HalError) {
        self.capture.lock().failures.push((attempt, error));
    }
}

impl DigitalOutPort for RecordingPort {
    fn put_single_value(&mut self, value: u32, _channel: u32, _gain: f64) -> HalResult<()> {
        let mut capture = self.capture.lock();
        let attempt = capture.attempts;
        capture.attempts += 1;

        if let Some(pos) = capture.failures.iter().position(|(at, _)| *at == attempt) {
            let (_, error) = capture.failures.swap_remove(pos);
            return Err(error);
        }

        capture.values.push(value & line_mask(self.resolution));
        Ok(())
    }

    fn resolution(&self) -> u8 {
        self.resolution
    }
}

/// Port standing in for a board that is not installed: every write fails.
#[derive(Debug, Clone, Copy)]
pub struct AbsentPort {
    resolution: u8,
}

impl Default for AbsentPort {
    fn default() -> Self {
        Self { resolution: 32 }
    }
}

impl AbsentPort {
    pub fn with_resolution(resolution: u8) -> Self {
        Self { resolution }
    }
}

impl DigitalOutPort for AbsentPort {
    fn put_single_value(&mut self, _value: u32, _channel: u32, _gain: f64) -> HalResult<()> {
        Err(HalError::NotPresent)
    }

    fn resolution(&self) -> u8 {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dout::{DEFAULT_CHANNEL, DEFAULT_GAIN};

    #[test]
    fn clones_share_capture() {
        let port = RecordingPort::new();
        let mut writer = port.clone();
        writer.put_single_value(0x1234, DEFAULT_CHANNEL, DEFAULT_GAIN).unwrap();
        writer.put_single_value(0xBEEF, DEFAULT_CHANNEL, DEFAULT_GAIN).unwrap();

        assert_eq!(port.values(), vec![0x1234, 0xBEEF]);
        assert_eq!(port.current(), Some(0xBEEF));
    }

    #[test]
    fn take_values_drains_capture() {
        let port = RecordingPort::new();
        let mut writer = port.clone();
        writer.put_single_value(1, DEFAULT_CHANNEL, DEFAULT_GAIN).unwrap();
        writer.put_single_value(2, DEFAULT_CHANNEL, DEFAULT_GAIN).unwrap();
        assert_eq!(port.take_values(), vec![1, 2]);

        writer.put_single_value(3, DEFAULT_CHANNEL, DEFAULT_GAIN).unwrap();
        assert_eq!(port.take_values(), vec![3]);
        assert_eq!(port.current(), None);
        assert_eq!(port.attempts(), 3);
    }

    #[test]
    fn truncates_to_resolution() {
        let mut port = RecordingPort::with_resolution(16);
        port.put_single_value(0x0001_ABCD, DEFAULT_CHANNEL, DEFAULT_GAIN).unwrap();
        assert_eq!(port.values(), vec![0xABCD]);
    }

    #[test]
    fn injected_failure_is_not_latched() {
        let mut port = RecordingPort::new();
        port.fail_attempt(1, HalError::VendorError(-7));

        port.put_single_value(1, 0, 1.0).unwrap();
        let err = port.put_single_value(2, 0, 1.0).unwrap_err();
        port.put_single_value(3, 0, 1.0).unwrap();

        assert_eq!(err, HalError::VendorError(-7));
        assert_eq!(port.values(), vec![1, 3]);
        assert_eq!(port.attempts(), 3);
    }

    #[test]
    fn absent_port_always_fails() {
        let mut port = AbsentPort::default();
        assert_eq!(
            port.put_single_value(0, 0, 1.0),
            Err(HalError::NotPresent)
        );
        assert_eq!(port.resolution(), 32);
    }

    #[test]
    fn line_mask_covers_low_lines() {
        assert_eq!(line_mask(16), 0xFFFF);
        assert_eq!(line_mask(32), u32::MAX);
        assert_eq!(line_mask(0), 0);
    }
}
