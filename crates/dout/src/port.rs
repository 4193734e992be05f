//! Port session: the writer, the bit operations and the posting operations.
//!
//! Every posting operation follows the same sequence per fragment: add the
//! fragment to the checksum, write it, then settle if the operation asks
//! for it. Bit operations write without touching the checksum; they carry
//! status, not data.

use hal::dout::{DEFAULT_CHANNEL, DEFAULT_GAIN};
use hal::DigitalOutPort;
use thiserror::Error;

use crate::checksum::Checksum;
use crate::config::{ConfigError, PortConfig, PortWidth};
use crate::diag::{DiagnosticSink, LogSink, WriteFailure};
use crate::encode;
use crate::settle::Settle;

/// Whether an operation settles after its write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Delay {
    #[default]
    NoWait,
    Wait,
}

impl Delay {
    pub fn settles(self) -> bool {
        matches!(self, Self::Wait)
    }
}

/// Errors returned by posting operations.
///
/// Device write failures are not among them; see [`crate::diag`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PostError {
    #[error("{operation} needs a 32-bit port, session is configured for {width} bits")]
    WidthMismatch { operation: &'static str, width: u8 },
}

/// What the writer remembers between writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortState {
    /// Last value written, after toggling and before shifting.
    pub last_value: u32,
    pub toggle_mask: u32,
    pub bit_shift: u8,
    pub width: PortWidth,
}

impl PortState {
    fn from_config(config: &PortConfig) -> Self {
        Self {
            last_value: 0,
            toggle_mask: config.toggle_mask,
            bit_shift: config.bit_shift,
            width: config.width,
        }
    }

    /// Applies the toggle mask, returning `(logical, raw)`.
    fn mask(&self, value: u32) -> (u32, u32) {
        let logical = if self.toggle_mask != 0 {
            value ^ self.toggle_mask
        } else {
            value
        };
        (logical, logical << self.bit_shift)
    }
}

/// Counters kept by a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Data fragments added to the checksum.
    pub fragments: u64,
    /// Raw writes attempted, status writes included.
    pub writes: u64,
    pub write_failures: u64,
    pub settles: u64,
}

/// Owns a digital output port and everything posted to it.
pub struct PortSession<P: DigitalOutPort> {
    port: P,
    state: PortState,
    checksum: Checksum,
    settle: Settle,
    sink: Box<dyn DiagnosticSink>,
    stats: SessionStats,
}

impl<P: DigitalOutPort> PortSession<P> {
    /// Validates `config` against the port and opens a session on it.
    pub fn new(config: PortConfig, port: P) -> Result<Self, ConfigError> {
        config.validate_for(port.resolution())?;
        log::info!(
            "port session: {} bits, shift {}, toggle mask {:#x}, settle {:?}",
            config.width.bits(),
            config.bit_shift,
            config.toggle_mask,
            config.settle
        );
        Ok(Self {
            port,
            state: PortState::from_config(&config),
            checksum: Checksum::default(),
            settle: config.settle,
            sink: Box::new(LogSink::new()),
            stats: SessionStats::default(),
        })
    }

    /// Replaces the diagnostic sink.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn state(&self) -> &PortState {
        &self.state
    }

    pub fn last_value(&self) -> u32 {
        self.state.last_value
    }

    pub fn toggle_mask(&self) -> u32 {
        self.state.toggle_mask
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    // --- writer ---

    /// Toggles, remembers, shifts and writes one value.
    fn write(&mut self, value: u32) {
        let (logical, raw) = self.state.mask(value);
        self.state.last_value = logical;
        self.stats.writes += 1;
        log::trace!("write {:#010x} (raw {:#010x})", logical, raw);

        if let Err(error) = self.port.put_single_value(raw, DEFAULT_CHANNEL, DEFAULT_GAIN) {
            self.stats.write_failures += 1;
            self.sink.write_failed(&WriteFailure {
                logical,
                raw,
                error,
            });
        }
    }

    /// Busy-waits for the configured settle time.
    pub fn settle(&mut self) {
        self.stats.settles += 1;
        log::trace!("settle {:?}", self.settle);
        self.settle.wait();
    }

    fn settle_if(&mut self, delay: Delay) {
        if delay.settles() {
            self.settle();
        }
    }

    /// Checksums `sum_value`, writes `value`, optionally settles.
    fn post(&mut self, sum_value: u32, value: u32, delay: Delay) {
        self.checksum.add(sum_value);
        self.stats.fragments += 1;
        log::debug!("post {:#06x}, checksum {:#06x}", value, self.checksum.get());
        self.write(value);
        self.settle_if(delay);
    }

    fn post_fragments(&mut self, fragments: &[u16]) {
        for &fragment in fragments {
            let fragment = u32::from(fragment);
            self.post(fragment, fragment, Delay::Wait);
        }
    }

    fn require_32(&self, operation: &'static str) -> Result<(), PostError> {
        match self.state.width {
            PortWidth::Bits32 => Ok(()),
            width => Err(PostError::WidthMismatch {
                operation,
                width: width.bits(),
            }),
        }
    }

    // --- posting ---

    /// Posts the low 16 bits of `value`.
    pub fn post_int16(&mut self, value: u32) {
        self.post_int16_with(value, Delay::NoWait);
    }

    /// Posts the low 16 bits of `value`, then settles.
    pub fn post_int16_wait(&mut self, value: u32) {
        self.post_int16_with(value, Delay::Wait);
    }

    pub fn post_int16_with(&mut self, value: u32, delay: Delay) {
        self.post(value, value & encode::FRAGMENT_MASK, delay);
    }

    /// Posts all 32 bits of `value` in one write.
    pub fn post_int32(&mut self, value: u32) -> Result<(), PostError> {
        self.post_int32_with(value, Delay::NoWait)
    }

    /// Posts all 32 bits of `value` in one write, then settles.
    pub fn post_int32_wait(&mut self, value: u32) -> Result<(), PostError> {
        self.post_int32_with(value, Delay::Wait)
    }

    pub fn post_int32_with(&mut self, value: u32, delay: Delay) -> Result<(), PostError> {
        self.require_32("postInt32")?;
        self.post(value, value, delay);
        Ok(())
    }

    /// Posts `value` as two settled 16-bit fragments, low half first.
    pub fn post_int32_2x16(&mut self, value: u32) {
        self.post_fragments(&encode::split32(value));
    }

    /// Posts the bit pattern of `value` as two settled fragments, low first.
    pub fn post_float(&mut self, value: f32) {
        self.post_fragments(&encode::float(value));
    }

    /// Posts text two bytes per settled fragment; see [`encode::text`].
    pub fn post_string(&mut self, text: &str, declared_len: usize) {
        self.post_bytes(text.as_bytes(), declared_len);
    }

    pub fn post_bytes(&mut self, bytes: &[u8], declared_len: usize) {
        let fragments = encode::text(bytes, declared_len);
        self.post_fragments(&fragments);
    }

    // --- toggle on post ---

    /// Toggles `mask` on every subsequent write; 0 stops toggling.
    pub fn toggle_bits_on_post(&mut self, mask: u32) {
        self.state.toggle_mask = mask;
    }

    // --- bit operations ---

    /// Sets `mask` high on top of the last value.
    pub fn set_bits(&mut self, mask: u32) {
        self.set_bits_with(mask, Delay::NoWait);
    }

    pub fn set_bits_wait(&mut self, mask: u32) {
        self.set_bits_with(mask, Delay::Wait);
    }

    pub fn set_bits_with(&mut self, mask: u32, delay: Delay) {
        self.write(self.state.last_value | mask);
        self.settle_if(delay);
    }

    /// Clears `mask` from the last value.
    pub fn clear_bits(&mut self, mask: u32) {
        self.clear_bits_with(mask, Delay::NoWait);
    }

    pub fn clear_bits_wait(&mut self, mask: u32) {
        self.clear_bits_with(mask, Delay::Wait);
    }

    pub fn clear_bits_with(&mut self, mask: u32, delay: Delay) {
        self.write(self.state.last_value & !mask);
        self.settle_if(delay);
    }

    /// Flips `mask` in the last value.
    pub fn toggle_bits(&mut self, mask: u32) {
        self.toggle_bits_with(mask, Delay::NoWait);
    }

    pub fn toggle_bits_wait(&mut self, mask: u32) {
        self.toggle_bits_with(mask, Delay::Wait);
    }

    pub fn toggle_bits_with(&mut self, mask: u32, delay: Delay) {
        self.write(self.state.last_value ^ mask);
        self.settle_if(delay);
    }

    // --- checksum ---

    /// Checksum of everything posted since the last [`set_checksum`](Self::set_checksum).
    pub fn checksum(&self) -> u16 {
        self.checksum.get()
    }

    pub fn set_checksum(&mut self, value: u16) {
        log::info!("checksum set to {:#06x} (was {:#06x})", value, self.checksum.get());
        self.checksum.set(value);
    }
}

impl<P: DigitalOutPort + std::fmt::Debug> std::fmt::Debug for PortSession<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortSession")
            .field("port", &self.port)
            .field("state", &self.state)
            .field("checksum", &self.checksum)
            .field("settle", &self.settle)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
