//! Port configuration.
//!
//! The board's output subsystem is opened with a fixed number of lines. The
//! posting code needs to know that number up front: a 32-bit single-shot
//! post only makes sense on a port configured for 32 lines, and the bit
//! shift must leave room for the shifted value.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::settle::Settle;

/// Errors raised while validating a [`PortConfig`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported port width: {0} bits (expected 16 or 32)")]
    UnsupportedWidth(u8),
    #[error("bit shift {shift} leaves no lines on a {width}-bit port")]
    ShiftOutOfRange { shift: u8, width: u8 },
    #[error("port has {available} lines, configuration needs {required}")]
    ResolutionTooLow { required: u8, available: u8 },
}

/// Number of lines the posting code expects to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum PortWidth {
    Bits16,
    #[default]
    Bits32,
}

impl PortWidth {
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits16 => 16,
            Self::Bits32 => 32,
        }
    }
}

impl TryFrom<u8> for PortWidth {
    type Error = ConfigError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            16 => Ok(Self::Bits16),
            32 => Ok(Self::Bits32),
            other => Err(ConfigError::UnsupportedWidth(other)),
        }
    }
}

impl From<PortWidth> for u8 {
    fn from(width: PortWidth) -> Self {
        width.bits()
    }
}

/// Configuration for a [`PortSession`](crate::PortSession).
///
/// The defaults match the reference board setup: 32 output lines (ports A
/// through D), no shift, toggling off, and the calibrated spin settle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PortConfig {
    pub width: PortWidth,
    /// Left shift applied to every value immediately before the raw write.
    pub bit_shift: u8,
    /// Initial toggle-on-post mask; 0 disables toggling.
    pub toggle_mask: u32,
    pub settle: Settle,
}

impl PortConfig {
    /// Creates a new port configuration builder.
    pub fn builder() -> PortConfigBuilder {
        PortConfigBuilder::default()
    }

    /// Checks the configuration on its own, without a port.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.width.bits();
        if self.bit_shift >= width {
            return Err(ConfigError::ShiftOutOfRange {
                shift: self.bit_shift,
                width,
            });
        }
        Ok(())
    }

    /// Checks the configuration against a port offering `resolution` lines.
    pub fn validate_for(&self, resolution: u8) -> Result<(), ConfigError> {
        self.validate()?;
        let required = self.width.bits();
        if resolution < required {
            return Err(ConfigError::ResolutionTooLow {
                required,
                available: resolution,
            });
        }
        Ok(())
    }
}

/// Builder for ergonomic port configuration construction.
#[derive(Debug, Clone, Default)]
pub struct PortConfigBuilder {
    config: PortConfig,
}

impl PortConfigBuilder {
    /// Sets the expected port width.
    pub fn width(mut self, width: PortWidth) -> Self {
        self.config.width = width;
        self
    }

    /// Sets the shift applied before every raw write.
    pub fn bit_shift(mut self, shift: u8) -> Self {
        self.config.bit_shift = shift;
        self
    }

    /// Sets the initial toggle-on-post mask.
    pub fn toggle_mask(mut self, mask: u32) -> Self {
        self.config.toggle_mask = mask;
        self
    }

    /// Sets the settle strategy.
    pub fn settle(mut self, settle: Settle) -> Self {
        self.config.settle = settle;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> PortConfig {
        self.config
    }
}
