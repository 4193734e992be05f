//! Digital output subsystem abstraction

use crate::error::HalResult;

/// Channel used for single-value writes to the whole port.
pub const DEFAULT_CHANNEL: u32 = 0;

/// Gain passed with single-value writes; digital subsystems ignore it.
pub const DEFAULT_GAIN: f64 = 1.0;

/// Digital output subsystem configured for single-value operation.
///
/// One call to [`put_single_value`](Self::put_single_value) latches one value
/// onto every configured output line at once. Opening, configuring and
/// releasing the subsystem is the implementation's business.
pub trait DigitalOutPort: Send {
    /// Write a value to the port lines of `channel`.
    fn put_single_value(&mut self, value: u32, channel: u32, gain: f64) -> HalResult<()>;

    /// Number of output lines the subsystem was configured with.
    fn resolution(&self) -> u8;
}

impl<T: DigitalOutPort + ?Sized> DigitalOutPort for &mut T {
    fn put_single_value(&mut self, value: u32, channel: u32, gain: f64) -> HalResult<()> {
        (**self).put_single_value(value, channel, gain)
    }

    fn resolution(&self) -> u8 {
        (**self).resolution()
    }
}

#[cfg(feature = "std")]
impl<T: DigitalOutPort + ?Sized> DigitalOutPort for std::boxed::Box<T> {
    fn put_single_value(&mut self, value: u32, channel: u32, gain: f64) -> HalResult<()> {
        (**self).put_single_value(value, channel, gain)
    }

    fn resolution(&self) -> u8 {
        (**self).resolution()
    }
}

/// Mask covering the low `bits` lines of a port.
pub const fn line_mask(bits: u8) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}
