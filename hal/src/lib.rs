//! Hardware Abstraction Layer (HAL) for digital output boards
//!
//! This crate provides the vendor-agnostic seam between the posting protocol
//! and a data-acquisition board's digital output subsystem. Board drivers
//! implement [`dout::DigitalOutPort`]; the simulated ports in [`sim`] stand in
//! for a real board in tests and on hosts without one installed.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod dout;
pub mod error;

#[cfg(feature = "std")]
pub mod sim;

// Re-export commonly used types
pub use dout::DigitalOutPort;
pub use error::{HalError, HalResult};
