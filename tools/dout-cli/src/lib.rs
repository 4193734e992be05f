//! Host-side driver for posting scripts.
//!
//! Runs command scripts (see [`dout::command`]) against a simulated port and
//! renders the resulting port trace, so a script can be checked against what
//! the acquisition side expects before it goes near a real board.

mod calibrate;
mod formatter;
mod runner;

pub use calibrate::{calibrate, suggest_iterations, Calibration};
pub use formatter::TraceFormatter;
pub use runner::{RunOptions, Runner, StepReport};
