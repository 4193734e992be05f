//! Status lines and session framing.
//!
//! The acquisition system watches a few lines above the 16 data lines to
//! know when the port carries something worth decoding. Data values sit on
//! lines 0–15; the status bits below live on port C/D.

use bitflags::bitflags;
use hal::DigitalOutPort;

use crate::port::{Delay, PortSession};

bitflags! {
    /// Status lines understood by the acquisition system.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusBits: u32 {
        /// Data strobe. Toggled to announce header or checksum data.
        const DATA = 0x0001_0000;
        /// Display running. Must be high before any other line is read.
        const RUN = 0x0004_0000;
        /// Frame toggle. Flipped once per displayed frame.
        const REFRESH = 0x0008_0000;
    }
}

/// Largest value postable on 16 data lines; marks a blank sweep.
pub const BLANK_SWEEP: u32 = 0x0000_FFFF;

/// Quiet-NaN pattern posted in place of a missing float.
pub const FLOAT_NAN: u32 = 0x7FFF_FFFF;

/// Every line the acquisition system looks at, status lines included.
pub const ALL_LINES: u32 = 0x00FF_FFFF;

impl<P: DigitalOutPort> PortSession<P> {
    pub fn set_status(&mut self, bits: StatusBits, delay: Delay) {
        self.set_bits_with(bits.bits(), delay);
    }

    pub fn clear_status(&mut self, bits: StatusBits, delay: Delay) {
        self.clear_bits_with(bits.bits(), delay);
    }

    pub fn toggle_status(&mut self, bits: StatusBits, delay: Delay) {
        self.toggle_bits_with(bits.bits(), delay);
    }

    /// Status lines currently high, per the tracked last value.
    pub fn status(&self) -> StatusBits {
        StatusBits::from_bits_truncate(self.last_value())
    }

    /// Ends a session by posting its checksum.
    ///
    /// Clears the data lines, posts the checksum, resets it to 0, strobes
    /// [`StatusBits::DATA`] (settled) so the acquisition side latches the
    /// checksum, then drops every line, `RUN` included. Returns the checksum
    /// that was posted.
    pub fn post_checksum_trailer(&mut self) -> u16 {
        self.post_int16(0);
        let checksum = self.checksum();
        self.post_int16(u32::from(checksum));
        self.set_checksum(0);
        self.toggle_status(StatusBits::DATA, Delay::Wait);
        self.clear_bits(ALL_LINES);
        checksum
    }
}
