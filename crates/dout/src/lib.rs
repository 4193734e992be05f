//! # dout
//!
//! Posts event codes to a data-acquisition board's digital output port so an
//! independent acquisition system sampling the lines at a fixed rate can
//! reconstruct them.
//!
//! ## Module Overview
//! - [`encode`]   – Splitting integers, floats and text into 16-bit fragments.
//! - [`checksum`] – Running 16-bit sum of every posted fragment.
//! - [`settle`]   – Busy-wait delays that keep a value on the lines long
//!   enough for the sampler to see it.
//! - [`config`]   – Port width, bit shift, toggle mask and settle strategy.
//! - [`diag`]     – Where device write failures are reported.
//! - [`port`]     – [`PortSession`], the writer and the bit operations.
//! - [`status`]   – Status lines and the end-of-session checksum trailer.
//! - [`command`]  – Textual commands for scripted or interactive posting.
//!
//! All state lives in one [`PortSession`]; nothing is global, so several
//! sessions (or a session per test) can coexist.

pub mod checksum;
pub mod command;
pub mod config;
pub mod diag;
pub mod encode;
pub mod port;
pub mod settle;
pub mod status;

pub use checksum::Checksum;
pub use command::{check_script, parse_script, Command, ExecError, ParseError, ScriptError, ScriptLine};
pub use config::{ConfigError, PortConfig, PortConfigBuilder, PortWidth};
pub use diag::{DiagnosticSink, LogSink, WriteFailure};
pub use port::{Delay, PortSession, PortState, PostError, SessionStats};
pub use settle::Settle;
pub use status::{StatusBits, ALL_LINES, BLANK_SWEEP, FLOAT_NAN};
